use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use sentence_erp::{io::write_epochs, EpochConfig, EventSubset, Study, StudyConfig};

#[derive(Clone, Copy, ValueEnum)]
enum Subset {
    NonArtefact,
    NonReject,
}

impl From<Subset> for EventSubset {
    fn from(s: Subset) -> Self {
        match s {
            Subset::NonArtefact => EventSubset::NonArtefact,
            Subset::NonReject   => EventSubset::NonReject,
        }
    }
}

#[derive(Parser)]
#[command(name = "erp-events", about = "Reconstruct word events and export ERP epochs")]
struct Args {
    /// Directory holding the corpus and EEG<id> recording files
    #[arg(long, default_value = "../data")]
    data_dir: PathBuf,

    /// Corpus container file name inside --data-dir
    #[arg(long, default_value = "stimuli_erp.json")]
    corpus_file: String,

    /// Load this snapshot instead of decoding --data-dir
    #[arg(long)]
    from_snapshot: Option<PathBuf>,

    /// Write a snapshot of the loaded study
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Directory to write epoch_<participant>.safetensors files into
    #[arg(long)]
    export: Option<PathBuf>,

    /// Only print / export this participant
    #[arg(long)]
    participant: Option<u32>,

    /// Event subset to export
    #[arg(long, value_enum, default_value_t = Subset::NonArtefact)]
    subset: Subset,

    /// Pre-stimulus baseline in seconds (default: 0.1)
    #[arg(long, default_value_t = 0.1)]
    baseline: f64,

    /// Post-stimulus trial length in seconds (default: 0.7)
    #[arg(long, default_value_t = 0.7)]
    trial: f64,

    /// Print every event of the selected recordings
    #[arg(long)]
    events: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = StudyConfig {
        data_dir: args.data_dir.clone(),
        corpus_file: args.corpus_file.clone(),
        epoch: EpochConfig { baseline_secs: args.baseline, trial_secs: args.trial },
        ..StudyConfig::default()
    };

    let study = match &args.from_snapshot {
        Some(path) => Study::load_snapshot(path)?,
        None => Study::load(&cfg)?,
    };
    println!("{}", study.corpus);
    println!("{study}");
    for s in &study.skipped {
        println!("  skipped {}: {}", s.path.display(), s.error);
    }

    if let Some(path) = &args.snapshot {
        study.save(path)?;
        println!("Snapshot → {}", path.display());
    }

    let selected: Vec<_> = match args.participant {
        Some(id) => match study.recording(id) {
            Some(r) => vec![r],
            None => bail!("participant {id} not in study"),
        },
        None => study.recordings.iter().collect(),
    };

    for rec in &selected {
        println!("{rec} | {:.1} s", rec.duration_secs());
        if args.events {
            for e in &rec.events.events {
                println!("  {e}");
            }
        }
    }

    if let Some(dir) = &args.export {
        std::fs::create_dir_all(dir)?;
        let subset = EventSubset::from(args.subset);
        for rec in &selected {
            let out = dir.join(format!("epoch_{}.safetensors", rec.participant_id));
            let summary = write_epochs(rec, subset, &cfg.epoch, &out)?;
            println!(
                "participant {}: {} epochs ({} out of bounds) → {}",
                rec.participant_id, summary.exported, summary.out_of_bounds, out.display()
            );
        }
    }

    Ok(())
}

// Interactive standardization of one target column
//
// Usage: cargo run --bin standardize -- <dataset.csv> <"Clinic Name"|"Isolated Organisms">
//            [--mapping FILE] [--out-data FILE] [--out-mapping FILE] [--config FILE]

use anyhow::{bail, Context, Result};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use value_standardizer::data::{load_dataset, read_mapping_file, write_dataset, write_mapping_file};
use value_standardizer::resolution::Prompt;
use value_standardizer::{
    CanonicalValue, Coverage, PendingItem, ResolutionDecision, Session, SessionState, StandardizerConfig, TargetColumn,
};

struct Args {
    dataset: PathBuf,
    column: TargetColumn,
    mapping: Option<PathBuf>,
    out_data: PathBuf,
    out_mapping: PathBuf,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut positional = Vec::new();
    let mut mapping = None;
    let mut out_data = None;
    let mut out_mapping = None;
    let mut config = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().with_context(|| format!("{} needs a value", flag));
        match arg.as_str() {
            "--mapping" => mapping = Some(PathBuf::from(value("--mapping")?)),
            "--out-data" => out_data = Some(PathBuf::from(value("--out-data")?)),
            "--out-mapping" => out_mapping = Some(PathBuf::from(value("--out-mapping")?)),
            "--config" => config = Some(PathBuf::from(value("--config")?)),
            _ => positional.push(arg.clone()),
        }
    }

    if positional.len() != 2 {
        bail!("usage: standardize <dataset.csv> <column> [--mapping FILE] [--out-data FILE] [--out-mapping FILE] [--config FILE]");
    }
    let column = TargetColumn::from_column_name(&positional[1])
        .with_context(|| format!("Unknown target column: {}", positional[1]))?;
    let dataset = PathBuf::from(&positional[0]);

    Ok(Args {
        out_data: out_data.unwrap_or_else(|| dataset.with_extension("standardized.csv")),
        out_mapping: out_mapping
            .or_else(|| mapping.clone())
            .unwrap_or_else(|| PathBuf::from("mapping.tsv")),
        dataset,
        column,
        mapping,
        config,
    })
}

enum Answer {
    Decision(ResolutionDecision),
    Quit,
}

fn read_line(stdin: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if stdin.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Ask for one token until a usable decision (or quit) is given
fn ask(prompt: &Prompt, stdin: &mut impl BufRead) -> Result<Answer> {
    println!("\n'{}' (key: {})", prompt.token.raw, prompt.token.key);
    for (rank, candidate) in prompt.candidates.iter().enumerate() {
        println!("  [{}] {} ({})", rank + 1, candidate.canonical, candidate.score);
    }
    if prompt.requires_free_text() {
        println!("  no candidates: type a replacement");
    }

    loop {
        print!("number, replacement text, k = keep '{}', q = quit > ", prompt.token.display);
        io::stdout().flush()?;

        let Some(input) = read_line(stdin)? else {
            return Ok(Answer::Quit);
        };
        let decision = match input.as_str() {
            "" => continue,
            "q" => return Ok(Answer::Quit),
            "k" => prompt.keep_as_is(),
            text => match text.parse::<usize>() {
                Ok(n) if n >= 1 && !prompt.requires_free_text() => prompt.choose(n - 1),
                _ => prompt.free_text(text),
            },
        };
        match decision {
            Ok(decision) => return Ok(Answer::Decision(decision)),
            Err(e) => println!("  {}", e),
        }
    }
}

/// Final apply question; only an explicit `y` applies the mappings
fn ask_apply(staged: &[(String, CanonicalValue)], stdin: &mut impl BufRead) -> Result<bool> {
    if !staged.is_empty() {
        println!("\nDecisions to commit:");
        for (key, canonical) in staged {
            println!("  {} -> {}", key, canonical);
        }
    }
    print!("Apply mappings to the dataset? [y/N] > ");
    io::stdout().flush()?;
    let answer = read_line(stdin)?.unwrap_or_default();
    Ok(answer.eq_ignore_ascii_case("y"))
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "value_standardizer=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => StandardizerConfig::load(path)?,
        None => StandardizerConfig::default(),
    }
    .with_env_overrides()?;

    let dataset = load_dataset(&args.dataset)?;
    let store = match &args.mapping {
        Some(path) if path.exists() => {
            let (store, warnings) = read_mapping_file(path, config.mapping_delimiter)?;
            for warning in &warnings.warnings {
                tracing::warn!("{}", warning);
            }
            Some(store)
        }
        _ => None,
    };

    let mut session = Session::new(args.column, config)?;
    match session.load(dataset, store)? {
        Coverage::Complete => println!("Every '{}' value is already mapped.", args.column),
        Coverage::Partial { pending } => println!("{} '{}' values need a decision.", pending, args.column),
    }

    let stdin = io::stdin();
    let mut stdin = stdin.lock();

    while let Some(item) = session.current_item().cloned() {
        match item {
            PendingItem::Token(prompt) => match ask(&prompt, &mut stdin)? {
                Answer::Decision(decision) => session.decide(decision)?,
                Answer::Quit => {
                    session.abandon();
                    println!("Abandoned; nothing written.");
                    return Ok(());
                }
            },
            PendingItem::Batch(batch) => {
                println!(
                    "\n=== Genus '{}' (part {}, {} tokens) ===",
                    batch.genus,
                    batch.part + 1,
                    batch.prompts.len()
                );
                for prompt in &batch.prompts {
                    match ask(prompt, &mut stdin)? {
                        Answer::Decision(decision) => session.decide(decision)?,
                        Answer::Quit => {
                            session.abandon();
                            println!("Abandoned; nothing written.");
                            return Ok(());
                        }
                    }
                }
                let changed = session.confirm()?;
                println!("Batch confirmed, {} keys changed.", changed.len());
            }
        }
    }

    if *session.state() != SessionState::AllResolved {
        bail!("Unexpected session state: {}", session.state());
    }

    if !ask_apply(&session.review(), &mut stdin)? {
        session.abandon();
        println!("Abandoned; nothing written.");
        return Ok(());
    }
    session.confirm()?;

    let output = session.export()?;
    write_dataset(&output.dataset, &args.out_data)?;
    write_mapping_file(&args.out_mapping, &output.mapping_file)?;

    println!("{}", serde_json::to_string_pretty(&output.summary)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_apply_asked_even_with_nothing_staged() {
        assert!(!ask_apply(&[], &mut Cursor::new("")).unwrap());
        assert!(!ask_apply(&[], &mut Cursor::new("\n")).unwrap());
        assert!(!ask_apply(&[], &mut Cursor::new("n\n")).unwrap());
        assert!(ask_apply(&[], &mut Cursor::new("y\n")).unwrap());
    }

    #[test]
    fn test_apply_requires_explicit_yes() {
        let staged = vec![(
            "sg clinic".to_string(),
            CanonicalValue::new("Singapore Clinic").unwrap(),
        )];
        assert!(ask_apply(&staged, &mut Cursor::new("Y\n")).unwrap());
        assert!(!ask_apply(&staged, &mut Cursor::new("yes please\n")).unwrap());
    }
}

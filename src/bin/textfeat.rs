//! textfeat CLI - Command-line interface for Texting Features
//!
//! Commands:
//! - extract: Append one feature row per transcript to a CSV file
//! - vocab: Print the normalized token inventory of a set of transcripts

use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use texting_features::features::{
    ActiveDaysExtractor, CategoryExtractor, ElapsedTimeExtractor, PosTagExtractor,
    SurveyExtractor, SurveyTable, TimeOfDayExtractor, WordCountExtractor,
};
use texting_features::text::CommandTagger;
use texting_features::{
    Conversation, Dictionary, FeatureError, FeaturePipeline, FeatureWriter, Normalizer,
    PipelineConfig, TextCleaner, TimeHistogramWriter, VERSION,
};

const DEFAULT_LOG_FILTER: &str = "textfeat=info,texting_features=info";
const VERBOSE_LOG_FILTER: &str = "textfeat=debug,texting_features=debug";

/// textfeat - Feature extraction for text-message transcripts
#[derive(Parser)]
#[command(name = "textfeat")]
#[command(version = VERSION)]
#[command(about = "Extract features from text-message transcripts", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append one feature row per transcript to a CSV file
    Extract(ExtractArgs),

    /// Print the normalized token inventory of the given transcripts
    Vocab(VocabArgs),
}

/// Options shared by every command that normalizes message bodies
#[derive(Args)]
struct CleaningArgs {
    /// Normalization passes per message [default: 3]
    #[arg(long, value_name = "N")]
    passes: Option<usize>,

    /// Repeat normalization passes until the tokens stop changing
    #[arg(long)]
    converge: bool,

    /// JSON run configuration; flags override its fields
    #[arg(long, value_name = "FILE.json")]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct VocabArgs {
    /// Tab-delimited normalizer rules
    #[arg(short, long, value_name = "NORM.dic")]
    norm: Option<PathBuf>,

    /// Dictionary to check tokens against
    #[arg(short, long, value_name = "FILE.dic")]
    dict: Option<PathBuf>,

    /// Transcripts to read
    #[arg(value_name = "FILE.csv", required = true)]
    files: Vec<PathBuf>,

    #[command(flatten)]
    cleaning: CleaningArgs,
}

#[derive(Args)]
struct ExtractArgs {
    /// Transcripts to analyze (speaker<TAB>MM/DD/YYYY HH:MM<TAB>body)
    #[arg(value_name = "FILE.csv", required = true)]
    files: Vec<PathBuf>,

    /// Dictionary file in .dic format; enables category counts
    #[arg(short, long, value_name = "FILE.dic")]
    dict: Option<PathBuf>,

    /// Survey results in .csv format, keyed by participant id
    #[arg(short, long, value_name = "SURVEY.csv")]
    survey: Option<PathBuf>,

    /// Output CSV, appended to [default: all_features.csv]
    #[arg(short, long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Tab-delimited set of replacements
    #[arg(short, long, value_name = "NORM.dic")]
    norm: Option<PathBuf>,

    /// Number of trailing days to process, 0 for all [default: 14]
    #[arg(short, long, value_name = "N")]
    time: Option<i64>,

    /// Count all words and short words
    #[arg(short = 'w', long)]
    countwords: bool,

    /// Count part-of-speech tags
    #[arg(short = 'p', long)]
    countpos: bool,

    /// Summarize response times between speakers
    #[arg(short = 'r', long)]
    responsetimes: bool,

    /// Words and messages per hour of the day
    #[arg(long)]
    timeofday: bool,

    /// Distinct days each speaker was active
    #[arg(long)]
    activedays: bool,

    /// Active days, word counts, POS counts, response times and time of day
    #[arg(long)]
    allfeatures: bool,

    /// Also append hour-of-day histograms to FILE
    #[arg(long, value_name = "FILE")]
    timehist: Option<PathBuf>,

    /// Report by-day features as rates of their first (count) feature
    #[arg(long)]
    normalize_rates: bool,

    /// Part-of-speech tagger command line (CoNLL output on stdout)
    #[arg(long, value_name = "CMD")]
    tagger_cmd: Option<String>,

    #[command(flatten)]
    cleaning: CleaningArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .init();
}

fn run(cli: Cli) -> Result<(), TextfeatCliError> {
    match cli.command {
        Commands::Extract(args) => cmd_extract(args),
        Commands::Vocab(args) => cmd_vocab(args),
    }
}

fn load_normalizer(path: Option<&Path>) -> Result<Normalizer, TextfeatCliError> {
    match path {
        Some(path) => Ok(Normalizer::load(path)?),
        None => Ok(Normalizer::new()),
    }
}

/// Configuration file (or defaults) with the normalization flags applied on top
fn cleaning_config(args: &CleaningArgs) -> Result<PipelineConfig, TextfeatCliError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(passes) = args.passes {
        config.normalization_passes = passes;
    }
    if args.converge {
        config.converge = true;
    }

    Ok(config)
}

/// Cleaning configuration with every extraction flag applied on top
fn effective_config(args: &ExtractArgs) -> Result<PipelineConfig, TextfeatCliError> {
    let mut config = cleaning_config(&args.cleaning)?;

    if let Some(out) = &args.out {
        config.output = out.clone();
    }
    if let Some(days) = args.time {
        config.time_window_days = days;
    }
    if args.normalize_rates {
        config.normalize_rates = true;
    }
    if let Some(command) = &args.tagger_cmd {
        config.tagger_command = command.clone();
    }

    Ok(config)
}

fn cmd_extract(args: ExtractArgs) -> Result<(), TextfeatCliError> {
    let config = effective_config(&args)?;
    debug!(config = %config.to_json()?, "effective configuration");

    let cleaner = TextCleaner::from_config(load_normalizer(args.norm.as_deref())?, &config);
    let mut pipeline = FeaturePipeline::from_config(cleaner, &config);

    if let Some(path) = &args.survey {
        let table = SurveyTable::load(path)?;
        pipeline.add_extractor(Box::new(SurveyExtractor::new(Arc::new(table))));
    }
    if args.activedays || args.allfeatures {
        pipeline.add_extractor(Box::new(ActiveDaysExtractor::new()));
    }
    if args.countwords || args.allfeatures {
        pipeline.add_extractor(Box::new(WordCountExtractor::with_normalization(
            config.normalize_rates,
        )));
    }
    if args.countpos || args.allfeatures {
        let tagger = CommandTagger::new(&config.tagger_command)?;
        pipeline.add_extractor(Box::new(
            PosTagExtractor::new(Box::new(tagger)).with_normalization(config.normalize_rates),
        ));
    }
    if let Some(path) = &args.dict {
        let dictionary = Dictionary::load(path)?;
        pipeline.add_extractor(Box::new(
            CategoryExtractor::new(Arc::new(dictionary)).with_normalization(config.normalize_rates),
        ));
    }
    if args.responsetimes || args.allfeatures {
        pipeline.add_extractor(Box::new(ElapsedTimeExtractor::new()));
    }
    if args.timeofday || args.allfeatures {
        pipeline.add_extractor(Box::new(TimeOfDayExtractor::new()));
    }

    info!(
        files = args.files.len(),
        extractors = ?pipeline.extractor_names(),
        output = %config.output.display(),
        "starting extraction"
    );

    let mut writer = FeatureWriter::append(&config.output)?;
    let mut histogram = match &args.timehist {
        Some(path) => Some(TimeHistogramWriter::append(path)?),
        None => None,
    };

    pipeline.run(&args.files, &mut writer, histogram.as_mut())?;
    Ok(())
}

fn cmd_vocab(args: VocabArgs) -> Result<(), TextfeatCliError> {
    let config = cleaning_config(&args.cleaning)?;
    let cleaner = TextCleaner::from_config(load_normalizer(args.norm.as_deref())?, &config);
    let dictionary = args.dict.as_deref().map(Dictionary::load).transpose()?;

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for path in &args.files {
        let conversation = Conversation::load(path, &cleaner)?;
        for (token, count) in conversation.token_counts() {
            *counts.entry(token).or_insert(0) += count;
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (token, count) in &counts {
        match &dictionary {
            Some(dictionary) => {
                writeln!(out, "{}\t{}\t{}", token, count, dictionary.has_match(token))?
            }
            None => writeln!(out, "{}\t{}", token, count)?,
        }
    }
    out.flush()?;

    Ok(())
}

// Error types

#[derive(Debug)]
enum TextfeatCliError {
    Io(io::Error),
    Feature(FeatureError),
}

impl From<io::Error> for TextfeatCliError {
    fn from(e: io::Error) -> Self {
        TextfeatCliError::Io(e)
    }
}

impl From<FeatureError> for TextfeatCliError {
    fn from(e: FeatureError) -> Self {
        TextfeatCliError::Feature(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<TextfeatCliError> for CliError {
    fn from(e: TextfeatCliError) -> Self {
        match e {
            TextfeatCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            TextfeatCliError::Feature(e) => {
                let (code, hint) = feature_error_code(&e);
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: hint.map(str::to_string),
                }
            }
        }
    }
}

fn feature_error_code(e: &FeatureError) -> (&'static str, Option<&'static str>) {
    match e {
        FeatureError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
        FeatureError::Csv(_) => ("CSV_ERROR", Some("Check the file's delimiters and quoting")),
        FeatureError::JsonError(_) => (
            "JSON_ERROR",
            Some("Check the configuration file's JSON syntax"),
        ),
        FeatureError::Pattern(_) => (
            "PATTERN_ERROR",
            Some("Normalizer patterns must be valid regular expressions"),
        ),
        FeatureError::NormalizerRule { .. } => (
            "NORMALIZER_ERROR",
            Some("Rules are 'pattern<TAB>replacement', one per line"),
        ),
        FeatureError::DictionaryEntry { .. } => (
            "DICTIONARY_ERROR",
            Some("Check the '%' section delimiters and category keys"),
        ),
        FeatureError::TranscriptRow { .. } => (
            "TRANSCRIPT_ERROR",
            Some("Rows are 'speaker<TAB>MM/DD/YYYY HH:MM<TAB>body'"),
        ),
        FeatureError::DateParseError(_) => ("DATE_ERROR", Some("Timestamps use MM/DD/YYYY HH:MM")),
        FeatureError::SurveyError(_) => (
            "SURVEY_ERROR",
            Some("The first column is the participant id; rows need the header's width"),
        ),
        FeatureError::Tagger(_) => (
            "TAGGER_ERROR",
            Some("Check --tagger-cmd; the tagger must print CoNLL output"),
        ),
        FeatureError::Extraction(_) => ("EXTRACTION_ERROR", None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocab_accepts_pass_options() {
        let cli = Cli::try_parse_from([
            "textfeat",
            "vocab",
            "--passes",
            "5",
            "--converge",
            "p01.csv",
        ])
        .unwrap();
        let Commands::Vocab(args) = cli.command else {
            panic!("expected the vocab command");
        };

        let config = cleaning_config(&args.cleaning).unwrap();
        assert_eq!(config.normalization_passes, 5);
        assert!(config.converge);
    }

    #[test]
    fn test_extract_and_vocab_share_cleaning() {
        let extract = Cli::try_parse_from(["textfeat", "extract", "--passes", "1", "p01.csv"])
            .unwrap();
        let vocab = Cli::try_parse_from(["textfeat", "vocab", "--passes", "1", "p01.csv"]).unwrap();

        let (Commands::Extract(extract), Commands::Vocab(vocab)) = (extract.command, vocab.command)
        else {
            panic!("unexpected commands");
        };
        let extract_cleaner =
            TextCleaner::from_config(Normalizer::new(), &effective_config(&extract).unwrap());
        let vocab_cleaner =
            TextCleaner::from_config(Normalizer::new(), &cleaning_config(&vocab.cleaning).unwrap());
        assert_eq!(extract_cleaner.pass_mode(), vocab_cleaner.pass_mode());
    }
}

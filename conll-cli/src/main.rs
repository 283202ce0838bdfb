//! brat2conll: linha de comando do conversor BRAT → CoNLL
//!
//! ```bash
//! # Converte resources/annotations para resources/conll_format/entities.conll
//! brat2conll convert
//!
//! # Só doenças e medicamentos, em multi-CoNLL, com cabeçalho por documento
//! brat2conll convert -t Disease Medication -n --header --name dev
//!
//! # Estatísticas do corpus em JSON, separando especialidades odontológicas
//! brat2conll stats --input resources/annotations --specialties specialty_mapper.json --output stats.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use conll_core::{collect_stats, ConvertOptions, Converter, SpecialtyMap, TokenizerMode};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_INPUT: &str = "resources/annotations";
const DEFAULT_OUT_DIR: &str = "resources/conll_format";

/// Converte anotações BRAT (standoff) em arquivos CoNLL com tags BIO
#[derive(Parser)]
#[command(name = "brat2conll", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Converte um diretório de pares .txt/.ann em um arquivo CoNLL
    Convert(ConvertArgs),
    /// Calcula estatísticas do corpus (frequências, aninhamentos, tamanhos)
    Stats(StatsArgs),
}

#[derive(Args)]
struct ConvertArgs {
    /// Diretório com os pares <id>.txt / <id>.ann
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Nome do arquivo de saída (sem extensão)
    #[arg(long, default_value = "entities")]
    name: String,

    /// Diretório onde <name>.conll é criado
    #[arg(long, default_value = DEFAULT_OUT_DIR)]
    out_dir: PathBuf,

    /// Caminho explícito da saída (ignora --name e --out-dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Mantém apenas os tipos indicados
    #[arg(short, long, value_name = "TYPE", num_args = 1..)]
    types: Vec<String>,

    /// Gera multi-CoNLL (todas as camadas aninhadas)
    #[arg(short = 'n', long, alias = "nested")]
    multiconll: bool,

    /// Texto dos tokens em minúsculas
    #[arg(long)]
    lowercase: bool,

    /// Remove acentos agudos das vogais
    #[arg(long)]
    strip_accents: bool,

    /// Escreve `-DOCSTART- <id>` antes de cada documento
    #[arg(long)]
    header: bool,

    /// Tokenizador usado nas regiões
    #[arg(long, value_enum)]
    tokenizer: Option<TokenizerArg>,

    /// Processa um documento por vez
    #[arg(long)]
    sequential: bool,

    /// Opções em JSON; flags explícitas têm precedência
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Progresso por documento
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args)]
struct StatsArgs {
    /// Diretório com os arquivos .ann
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Arquivo JSON de saída (padrão: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Tokenizador usado para medir as menções
    #[arg(long, value_enum, default_value_t = TokenizerArg::Standard)]
    tokenizer: TokenizerArg,

    /// JSON `{"<arquivo>": "<ESPECIALIDADE>"}` para separar documentos odontológicos
    #[arg(long, value_name = "FILE")]
    specialties: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum TokenizerArg {
    Standard,
    Unicode,
}

impl From<TokenizerArg> for TokenizerMode {
    fn from(arg: TokenizerArg) -> Self {
        match arg {
            TokenizerArg::Standard => TokenizerMode::Standard,
            TokenizerArg::Unicode => TokenizerMode::Unicode,
        }
    }
}

impl ConvertArgs {
    /// Opções finais: arquivo de configuração (se houver) sobreposto pelas flags.
    fn options(&self) -> anyhow::Result<ConvertOptions> {
        let mut options = match &self.config {
            Some(path) => ConvertOptions::from_json_file(path)
                .with_context(|| format!("falha ao carregar {}", path.display()))?,
            None => ConvertOptions::default(),
        };

        if !self.types.is_empty() {
            options.types = Some(self.types.clone());
        }
        options.nested |= self.multiconll;
        options.lowercase |= self.lowercase;
        options.strip_accents |= self.strip_accents;
        options.header |= self.header;
        options.verbose |= self.verbose;
        if let Some(tokenizer) = self.tokenizer {
            options.tokenizer = tokenizer.into();
        }
        if self.sequential {
            options.parallel = false;
        }
        Ok(options)
    }

    fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => self.out_dir.join(format!("{}.conll", self.name)),
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_convert(args: &ConvertArgs) -> anyhow::Result<()> {
    let options = args.options()?;
    let output = args.output_path();
    info!(input = %args.input.display(), output = %output.display(), mode = ?options.mode(), "convertendo corpus");

    let converter = Converter::new(options);
    let summary = converter
        .convert_to_path(&args.input, &output)
        .with_context(|| format!("falha ao converter {}", args.input.display()))?;

    info!(
        documents = summary.documents,
        tokens = summary.tokens,
        entities = summary.entities,
        discontinuous = summary.discontinuous,
        "✅ {} escrito",
        output.display()
    );
    Ok(())
}

fn run_stats(args: &StatsArgs) -> anyhow::Result<()> {
    let specialties = match &args.specialties {
        Some(path) => Some(
            SpecialtyMap::from_json_file(path)
                .with_context(|| format!("falha ao carregar {}", path.display()))?,
        ),
        None => None,
    };
    let tokenizer = TokenizerMode::from(args.tokenizer).build();
    let stats = collect_stats(&args.input, tokenizer.as_ref(), specialties.as_ref())
        .with_context(|| format!("falha ao ler {}", args.input.display()))?;
    let json = stats.to_json_pretty()?;

    match &args.output {
        Some(path) => write_file(path, &json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("falha ao criar {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("falha ao escrever {}", path.display()))?;
    info!("✅ {} escrito", path.display());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Convert(args) => {
            init_tracing(args.verbose);
            run_convert(args)
        }
        Commands::Stats(args) => {
            init_tracing(args.verbose);
            run_stats(args)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

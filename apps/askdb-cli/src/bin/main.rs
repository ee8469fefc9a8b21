use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use askdb_answer::{AnswerOptions, Answerer, ChatClient, ChatClientOptions};
use askdb_core::config::Config;
use askdb_core::types::{Corpus, Meta};
use askdb_hybrid::{FusionOptions, HybridRetriever};
use askdb_lexical::{LexicalIndex, LexicalOptions};
use askdb_vector::{
    default_provider, EmbeddingClientOptions, MemoryVectorIndex, SemanticIndex, SemanticOptions,
};

type Engine = HybridRetriever<LexicalIndex, SemanticIndex<MemoryVectorIndex>>;

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {prog} <search|ask> [args...]");
        eprintln!("  search \"<query>\" [docs_dir]   one-shot fused retrieval");
        eprintln!("  ask [docs_dir]                 interactive grounded answering");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;

    let (cmd, args) = parse_args();
    let runtime = tokio::runtime::Runtime::new()?;

    match cmd.as_str() {
        "search" => {
            let query = args.first().cloned().unwrap_or_else(|| {
                eprintln!("Usage: askdb search \"<query>\" [docs_dir]");
                std::process::exit(1)
            });
            let docs_dir = docs_dir(&config, args.get(1));
            let corpus = Arc::new(load_documents(&docs_dir)?);
            let engine = runtime.block_on(build_engine(&config, corpus.clone()))?;
            let k: usize = config.get("retrieval.k").unwrap_or(5);

            let outcome = runtime.block_on(engine.search(&query, k))?;
            if let Some(source) = outcome.degraded {
                println!("⚠️  degraded: {source:?} source unavailable");
            }
            if outcome.hits.is_empty() {
                println!("No results.");
            }
            for (rank, hit) in outcome.hits.iter().enumerate() {
                let (path, text) = corpus
                    .get(hit.doc)
                    .map(|doc| {
                        (
                            doc.metadata
                                .get("doc_path")
                                .cloned()
                                .unwrap_or_else(|| "<unknown>".to_string()),
                            snippet(&doc.text),
                        )
                    })
                    .unwrap_or_default();
                println!("{:>2}. [{:.4}] {} — {}", rank + 1, hit.score, path, text);
            }
        }
        "ask" => {
            let docs_dir = docs_dir(&config, args.first());
            let corpus = Arc::new(load_documents(&docs_dir)?);
            let engine = runtime.block_on(build_engine(&config, corpus.clone()))?;
            let model = ChatClient::new(chat_options(&config)?)?;
            let top_k: usize = config.get("retrieval.k").unwrap_or(5);
            let answerer = Answerer::new(
                corpus,
                engine,
                model,
                AnswerOptions {
                    top_k,
                    ..AnswerOptions::default()
                },
            )?;

            println!("💬 Ask questions about the corpus (empty line or 'exit' to quit)");
            let stdin = io::stdin();
            loop {
                print!("❓ ");
                io::stdout().flush()?;
                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 {
                    break;
                }
                let question = line.trim();
                if question.is_empty() || question == "exit" || question == "quit" {
                    break;
                }
                match runtime.block_on(answerer.ask(question)) {
                    Ok(answer) => {
                        if let Some(source) = answer.degraded {
                            println!("⚠️  degraded: {source:?} source unavailable");
                        }
                        println!("\n{}\n", answer.text);
                        println!("Sources:");
                        for (i, passage) in answer.passages.iter().enumerate() {
                            let path = passage
                                .metadata
                                .get("doc_path")
                                .map(String::as_str)
                                .unwrap_or("<unknown>");
                            println!("  [{}] {} ({:.4})", i + 1, path, passage.score);
                        }
                        println!();
                    }
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
        }
        _ => {
            eprintln!("Unknown command: {cmd}");
            std::process::exit(1);
        }
    }
    Ok(())
}

fn docs_dir(config: &Config, arg: Option<&String>) -> PathBuf {
    arg.map(PathBuf::from).unwrap_or_else(|| {
        let dir: String = config
            .get("data.docs_dir")
            .unwrap_or_else(|_| "./data/docs".to_string());
        PathBuf::from(dir)
    })
}

/// Read every `.txt` file under `docs_dir` as one document, in sorted path
/// order so corpus ids are stable across runs.
fn load_documents(docs_dir: &Path) -> anyhow::Result<Corpus> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(docs_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    if files.is_empty() {
        anyhow::bail!("no .txt files found under {}", docs_dir.display());
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files")?);

    let mut corpus = Corpus::new();
    for file in &files {
        let text = match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(_) => String::from_utf8_lossy(&std::fs::read(file)?).to_string(),
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            tracing::warn!(file = %file.display(), "skipping empty file");
            pb.inc(1);
            continue;
        }
        let mut metadata = Meta::new();
        metadata.insert("doc_path".to_string(), file.display().to_string());
        if let Some(stem) = file.file_stem().and_then(|s| s.to_str()) {
            metadata.insert("doc_id".to_string(), stem.to_string());
        }
        corpus.push(trimmed.to_string(), metadata)?;
        pb.inc(1);
    }
    pb.finish_and_clear();
    println!(
        "📚 Loaded {} documents from {}",
        corpus.len(),
        docs_dir.display()
    );
    Ok(corpus)
}

async fn build_engine(config: &Config, corpus: Arc<Corpus>) -> anyhow::Result<Engine> {
    let lexical = LexicalIndex::build(corpus.clone(), LexicalOptions::default())?;
    let embedder = default_provider(embedding_options(config))?;
    let semantic = SemanticIndex::build(
        &corpus,
        embedder,
        MemoryVectorIndex::default(),
        &SemanticOptions::default(),
    )
    .await?;
    let fusion = FusionOptions::new(
        config.get("fusion.lexical_weight").unwrap_or(0.5),
        config.get("fusion.semantic_weight").unwrap_or(0.5),
    );
    Ok(HybridRetriever::new(lexical, semantic, fusion)?)
}

fn embedding_options(config: &Config) -> EmbeddingClientOptions {
    let api_key = config
        .get::<String>("embedding.api_key")
        .ok()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .unwrap_or_default();
    let mut options = EmbeddingClientOptions::new(api_key);
    if let Ok(model) = config.get::<String>("embedding.model") {
        options = options.with_model(model);
    }
    if let Ok(url) = config.get::<String>("embedding.base_url") {
        options = options.with_base_url(url);
    }
    if let Ok(dim) = config.get::<usize>("embedding.dimension") {
        options = options.with_dimension(dim);
    }
    options
}

fn chat_options(config: &Config) -> anyhow::Result<ChatClientOptions> {
    let api_key = config
        .get::<String>("chat.api_key")
        .ok()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .filter(|k| !k.is_empty());
    let Some(api_key) = api_key else {
        anyhow::bail!("no chat api key configured; set chat.api_key in config.toml or OPENAI_API_KEY");
    };
    let mut options = ChatClientOptions::new(api_key);
    if let Ok(model) = config.get::<String>("chat.model") {
        options = options.with_model(model);
    }
    if let Ok(url) = config.get::<String>("chat.base_url") {
        options = options.with_base_url(url);
    }
    if let Ok(secs) = config.get::<u64>("chat.timeout_secs") {
        options = options.with_timeout(Duration::from_secs(secs));
    }
    Ok(options)
}

fn snippet(text: &str) -> String {
    const MAX: usize = 80;
    let mut s: String = text.chars().take(MAX).collect();
    if text.chars().count() > MAX {
        s.push('…');
    }
    s.replace('\n', " ")
}

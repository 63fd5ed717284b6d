use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use binstore_digest::{DigestAlgorithm, DigestEncoding, DigestEngine};
use binstore_resolver::Resolver;
use binstore_service::{BinaryService, ServiceConfig};
use binstore_types::{ByteStream, Identifier, Metadata, CONTENT_TYPE};
use colored::Colorize;
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let format = cli.format;
    match cli.command {
        Command::Exists(args) => cmd_exists(&config, format, args),
        Command::Get(args) => cmd_get(&config, args),
        Command::Put(args) => cmd_put(&config, format, args),
        Command::Purge(args) => cmd_purge(&config, format, args),
        Command::Digest(args) => cmd_digest(&config, format, args),
        Command::Algorithms => cmd_algorithms(format),
        Command::Partitions => cmd_partitions(&config, format),
        Command::Mint(args) => cmd_mint(&config, format, args),
        Command::Resolver(args) => cmd_resolver(&config, format, args),
    }
}

/// Load the given file, or `binstore.toml` when present, or defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ServiceConfig> {
    match path {
        Some(path) => ServiceConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None if Path::new(DEFAULT_CONFIG).is_file() => {
            ServiceConfig::load(DEFAULT_CONFIG).with_context(|| format!("loading {DEFAULT_CONFIG}"))
        }
        None => {
            tracing::debug!("no configuration file, using defaults");
            Ok(ServiceConfig::default())
        }
    }
}

fn service(config: &ServiceConfig) -> anyhow::Result<BinaryService> {
    BinaryService::from_config(config).context("building binary service")
}

fn parse_identifier(raw: &str) -> anyhow::Result<Identifier> {
    Identifier::parse(raw).with_context(|| format!("invalid identifier {raw:?}"))
}

fn cmd_exists(config: &ServiceConfig, format: OutputFormat, args: ContentArgs) -> anyhow::Result<()> {
    let service = service(config)?;
    let id = parse_identifier(&args.identifier)?;
    let exists = service.exists(&args.partition, &id)?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "identifier": id.as_str(), "exists": exists })),
        OutputFormat::Text if exists => println!("{} {}", "✓".green().bold(), id.as_str().bold()),
        OutputFormat::Text => println!("{} {} not found", "✗".red().bold(), id.as_str().bold()),
    }
    Ok(())
}

fn cmd_get(config: &ServiceConfig, args: GetArgs) -> anyhow::Result<()> {
    let service = service(config)?;
    let id = parse_identifier(&args.target.identifier)?;
    let Some(mut content) = service.get_content(&args.target.partition, &id)? else {
        bail!("{} not found in partition {}", id, args.target.partition);
    };
    let copied = match &args.output {
        Some(path) => {
            let mut file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            io::copy(&mut content, &mut file)?
        }
        None => {
            let mut stdout = io::stdout().lock();
            let n = io::copy(&mut content, &mut stdout)?;
            stdout.flush()?;
            n
        }
    };
    tracing::debug!(identifier = %id, bytes = copied, "content written");
    Ok(())
}

fn cmd_put(config: &ServiceConfig, format: OutputFormat, args: PutArgs) -> anyhow::Result<()> {
    let service = service(config)?;
    let id = parse_identifier(&args.target.identifier)?;
    let content: ByteStream = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(io::stdin()),
    };
    let mut metadata = Metadata::new();
    if let Some(ct) = args.content_type {
        metadata.insert(CONTENT_TYPE.to_string(), ct);
    }
    service.set_content(&args.target.partition, &id, content, &metadata)?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "identifier": id.as_str(), "stored": true })),
        OutputFormat::Text => println!("{} Stored {}", "✓".green().bold(), id.as_str().bold()),
    }
    Ok(())
}

fn cmd_purge(config: &ServiceConfig, format: OutputFormat, args: ContentArgs) -> anyhow::Result<()> {
    let service = service(config)?;
    let id = parse_identifier(&args.identifier)?;
    service.purge_content(&args.partition, &id)?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "identifier": id.as_str(), "purged": true })),
        OutputFormat::Text => println!("{} Purged {}", "✓".green().bold(), id.as_str().bold()),
    }
    Ok(())
}

fn cmd_digest(config: &ServiceConfig, format: OutputFormat, args: DigestArgs) -> anyhow::Result<()> {
    let algorithm: DigestAlgorithm = args.algorithm.parse()?;
    let encoding = match args.encoding {
        Some(EncodingArg::Hex) => DigestEncoding::Hex,
        Some(EncodingArg::Base64) => DigestEncoding::Base64,
        None => config.digest_encoding,
    };
    let engine = DigestEngine::new(encoding);
    let (source, digest) = match &args.file {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            (path.display().to_string(), digest_stream(engine, algorithm, file)?)
        }
        None => ("-".to_string(), digest_stream(engine, algorithm, io::stdin().lock())?),
    };
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "algorithm": algorithm.name(), "source": source, "digest": digest })
        ),
        OutputFormat::Text => println!("{}  {}", digest.yellow(), source),
    }
    Ok(())
}

fn digest_stream<R: Read>(engine: DigestEngine, algorithm: DigestAlgorithm, stream: R) -> anyhow::Result<String> {
    engine
        .digest_with(algorithm, stream)
        .with_context(|| format!("computing {algorithm} digest"))
}

fn cmd_algorithms(format: OutputFormat) -> anyhow::Result<()> {
    let names = DigestEngine::supported_algorithms();
    match format {
        OutputFormat::Json => println!("{}", json!(names)),
        OutputFormat::Text => {
            for name in names {
                match DigestAlgorithm::from_name(name) {
                    Some(alg) if alg.name() != name => println!("{} {}", name.bold(), format!("(alias of {alg})").dimmed()),
                    _ => println!("{}", name.bold()),
                }
            }
        }
    }
    Ok(())
}

fn cmd_partitions(config: &ServiceConfig, format: OutputFormat) -> anyhow::Result<()> {
    let service = service(config)?;
    match format {
        OutputFormat::Json => {
            let list: Vec<_> = service
                .partitions()
                .map(|p| {
                    json!({
                        "name": p.name(),
                        "prefix": p.prefix(),
                        "levels": p.levels(),
                        "length": p.length(),
                        "resolver": service.get_resolver_for_partition(p.name()).map(|r| r.name().to_string()),
                    })
                })
                .collect();
            println!("{}", serde_json::Value::Array(list));
        }
        OutputFormat::Text => {
            let mut any = false;
            for p in service.partitions() {
                any = true;
                let resolver = resolver_label(service.get_resolver_for_partition(p.name()));
                println!(
                    "{}  {}  levels={} length={}  {}",
                    p.name().bold(),
                    p.prefix().cyan(),
                    p.levels(),
                    p.length(),
                    resolver
                );
            }
            if !any {
                println!("No partitions configured.");
            }
        }
    }
    Ok(())
}

fn cmd_mint(config: &ServiceConfig, format: OutputFormat, args: MintArgs) -> anyhow::Result<()> {
    let service = service(config)?;
    let minted: Vec<String> = service.get_identifier_supplier(&args.partition)?.take(args.count).collect();
    match format {
        OutputFormat::Json => println!("{}", json!(minted)),
        OutputFormat::Text => {
            for id in minted {
                println!("{id}");
            }
        }
    }
    Ok(())
}

fn cmd_resolver(config: &ServiceConfig, format: OutputFormat, args: ResolverArgs) -> anyhow::Result<()> {
    let service = service(config)?;
    let resolver = service.get_resolver(&args.identifier);
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "identifier": args.identifier,
                "resolver": resolver.as_ref().map(|r| r.name().to_string()),
                "multipart": resolver.as_ref().map(|r| r.supports_multipart_upload()),
            })
        ),
        OutputFormat::Text => println!("{} → {}", args.identifier.bold(), resolver_label(resolver)),
    }
    Ok(())
}

fn resolver_label(resolver: Option<Arc<dyn Resolver>>) -> String {
    match resolver {
        Some(r) if r.supports_multipart_upload() => format!("{} {}", r.name().green(), "(multipart)".dimmed()),
        Some(r) => r.name().green().to_string(),
        None => "no resolver".red().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("binstore.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(dir.path().join("missing.toml").as_path())).is_err());
    }

    #[test]
    fn explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "digest_encoding = \"hex\"\n");
        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.digest_encoding, DigestEncoding::Hex);
    }

    #[test]
    fn put_get_purge_through_commands() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let config_path = write_config(
            dir.path(),
            &format!("[partitions.repository]\nprefix = \"file:\"\npath = {:?}\n", data.display().to_string()),
        );
        let config = load_config(Some(config_path.as_path())).unwrap();

        let input = dir.path().join("in.bin");
        std::fs::write(&input, b"Some data").unwrap();
        let target = ContentArgs {
            partition: "repository".into(),
            identifier: "file:x/y.bin".into(),
        };
        cmd_put(
            &config,
            OutputFormat::Json,
            PutArgs {
                target: target_clone(&target),
                input: Some(input),
                content_type: Some("application/octet-stream".into()),
            },
        )
        .unwrap();
        assert_eq!(std::fs::read(data.join("x/y.bin")).unwrap(), b"Some data");

        let output = dir.path().join("out.bin");
        cmd_get(
            &config,
            GetArgs {
                target: target_clone(&target),
                output: Some(output.clone()),
            },
        )
        .unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"Some data");

        cmd_purge(&config, OutputFormat::Json, target_clone(&target)).unwrap();
        assert!(!data.join("x/y.bin").exists());
        assert!(cmd_get(&config, GetArgs { target, output: None }).is_err());
    }

    fn target_clone(t: &ContentArgs) -> ContentArgs {
        ContentArgs {
            partition: t.partition.clone(),
            identifier: t.identifier.clone(),
        }
    }

    #[test]
    fn digest_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, b"Some data").unwrap();
        let engine = DigestEngine::HEX;
        let digest = digest_stream(engine, DigestAlgorithm::Md5, File::open(&file).unwrap()).unwrap();
        assert_eq!(digest, "5b82f8bf4df2bfb0e66ccaa7306fd024");

        let args = DigestArgs {
            algorithm: "SHA".into(),
            encoding: Some(EncodingArg::Base64),
            file: Some(file),
        };
        cmd_digest(&ServiceConfig::default(), OutputFormat::Json, args).unwrap();
    }

    #[test]
    fn digest_rejects_unknown_algorithm() {
        let args = DigestArgs {
            algorithm: "WHIRLPOOL".into(),
            encoding: None,
            file: None,
        };
        assert!(cmd_digest(&ServiceConfig::default(), OutputFormat::Text, args).is_err());
    }

    #[test]
    fn mint_unknown_partition_fails() {
        let args = MintArgs {
            partition: "nope".into(),
            count: 1,
        };
        assert!(cmd_mint(&ServiceConfig::default(), OutputFormat::Text, args).is_err());
    }

    #[test]
    fn resolver_label_variants() {
        colored::control::set_override(false);
        assert_eq!(resolver_label(None), "no resolver");
        let mem: Arc<dyn Resolver> = Arc::new(binstore_resolver::MemoryResolver::new());
        assert_eq!(resolver_label(Some(mem)), "memory (multipart)");
    }
}

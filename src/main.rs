use clap::{Parser, Subcommand};
use log::{LevelFilter, info};
use quire::environment::Environment;
use quire::{config, output, scan};
use std::path::PathBuf;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Content routing and post indexing for file-based blogs")]
#[command(long_about = "\
Content routing and post indexing for file-based blogs

Your filesystem is the data source. Pages are served by path, posts are
dated files laid out by one of four conventions, and tag or category pages
list the posts whose front matter matches.

Site structure:

  site/
  ├── config.toml                  # Site config (optional)
  ├── pages/
  │   ├── _index.html              # Served for /
  │   ├── about.html               # /about
  │   ├── _tag.html                # Template for /tag/<value>[/<value>...]
  │   └── _category.html           # Template for /category/<value>
  └── posts/
      └── 2020-03-02_second.html   # /2020/03/02/second (flat convention)

Post conventions:
  flat       posts/2020-03-02_slug.html
  hierarchy  posts/2020/03/02_slug.html
  year       posts/2020/03-02_slug.html
  user       posts/<any>/<depth>/2020-03-02_slug.html

A trailing /N on any path selects page N of a listing.

Run 'quire gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Site root directory
    #[arg(long, default_value = "site", global = true)]
    source: PathBuf,

    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the post index of every blog, newest first
    Scan {
        /// Only this blog
        #[arg(long)]
        blog: Option<String>,
        /// Print JSON instead of the text listing
        #[arg(long)]
        json: bool,
    },
    /// Show what a request path resolves to
    Resolve {
        /// Request path, e.g. /2020/03/02/second
        uri: String,
    },
    /// Print the posts listed by the page at a request path
    List {
        /// Request path, e.g. /tag/rust/2
        uri: String,
        /// Extra filter as inline TOML, e.g. 'has_tags = ["cli"]'
        #[arg(long)]
        filter: Option<String>,
    },
    /// Validate config and scan every blog
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Scan { blog, json } => {
            let mut env = Environment::load(&cli.source)?;
            let keys: Vec<String> = match blog {
                Some(key) => vec![key],
                None => env.resolver().blog_keys().map(str::to_string).collect(),
            };
            let mut indexed = Vec::with_capacity(keys.len());
            for key in keys {
                let posts = env.posts(&key)?;
                indexed.push((key, posts));
            }
            if json {
                let by_blog: serde_json::Map<String, serde_json::Value> = indexed
                    .iter()
                    .map(|(key, posts)| {
                        let descriptors: Vec<&scan::PostDescriptor> =
                            posts.iter().map(|p| &p.descriptor).collect();
                        Ok((key.clone(), serde_json::to_value(descriptors)?))
                    })
                    .collect::<Result<_, serde_json::Error>>()?;
                println!("{}", serde_json::to_string_pretty(&by_blog)?);
            } else {
                for (key, posts) in &indexed {
                    let convention = env
                        .resolver()
                        .blog_posts(key)
                        .map(|(_, c)| c)
                        .unwrap_or_default();
                    output::print_scan_output(key, convention, posts, env.root());
                }
            }
        }
        Command::Resolve { uri } => {
            let env = Environment::load(&cli.source)?;
            let reference = env.resolve(&uri)?;
            output::print_reference(&reference, env.root());
        }
        Command::List { uri, filter } => {
            let user_filter = filter
                .as_deref()
                .map(toml::from_str::<toml::Table>)
                .transpose()?;
            let mut env = Environment::load(&cli.source)?;
            let page = env.get_page(&uri)?;
            let slice = env.paginate(&page, user_filter.as_ref())?;
            let blog = page
                .reference()
                .blog_key
                .clone()
                .or_else(|| env.resolver().blog_keys().next().map(str::to_string))
                .unwrap_or_default();
            output::print_listing(page.reference(), &slice, |post| env.post_uri(&blog, post));
            info!("content cache: {}", env.cache().stats());
        }
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let mut env = Environment::load(&cli.source)?;
            let keys: Vec<String> = env.resolver().blog_keys().map(str::to_string).collect();
            let mut summary = Vec::with_capacity(keys.len());
            for key in keys {
                let count = env.posts(&key)?.len();
                let convention = env
                    .resolver()
                    .blog_posts(&key)
                    .map(|(_, c)| c)
                    .unwrap_or_default();
                summary.push((key, convention, count));
            }
            output::print_check_output(&summary);
            println!("==> Site is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

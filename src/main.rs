use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::error;
use segfs::DEFAULT_INODES;
#[cfg(unix)]
use segfs::{BLOCK_SIZE, FileSystem, Geometry, Layout, MappedRegion, Region};

#[derive(Parser)]
#[command(name = "segfs", about = "Single-segment file store on an image file")]
struct Args {
    /// Image file backing the segment
    #[arg(short, long, default_value = "segfs.img")]
    image: PathBuf,

    /// Data region size in MiB
    #[arg(long, default_value_t = 100)]
    region_mib: usize,

    /// Inode table capacity
    #[arg(long, default_value_t = DEFAULT_INODES)]
    inodes: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a fresh, empty segment
    Format,
    /// List every directory and its entries
    Ls,
    /// Import a host file
    Add {
        host_path: PathBuf,
        /// Name inside the store (defaults to the host path made absolute)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Delete a stored file
    Rm { name: String },
    /// Export a stored file to the host
    Extract {
        name: String,
        /// Destination (defaults to the stored name without its leading slash)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Create a directory
    Mkdir { name: String },
    /// Remove an empty directory
    Rmdir { name: String },
    /// Print a stored file to stdout
    Cat { name: String },
    /// Show block and inode usage
    Df,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("segfs: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(unix))]
fn run(_args: Args) -> segfs::Result<()> {
    Err(segfs::Error::MapFailed(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "mapped images need a unix host",
    )))
}

#[cfg(unix)]
fn run(args: Args) -> segfs::Result<()> {
    let region_size = args
        .region_mib
        .checked_mul(1024 * 1024)
        .ok_or(segfs::Error::InvalidGeometry)?;
    let geometry = Geometry::new(region_size, args.inodes)?;
    let layout = Layout::new(geometry);
    // The mapping is released when `fs` drops, on every path out of this function.
    let mut fs = match &args.command {
        Command::Format => {
            FileSystem::format(MappedRegion::open(&args.image, layout.total_len)?, geometry)?
        }
        _ => FileSystem::load(MappedRegion::open_existing(&args.image, layout.total_len)?, geometry)?,
    };
    match args.command {
        Command::Format => {
            println!("{}", fs.dump().lines().next().unwrap_or_default());
        }
        Command::Ls => {
            // Both walks go in inode order, so entries line up under their directory.
            let mut entries = fs.list().peekable();
            for dir in fs.directories()? {
                println!("Directory: {}", dir);
                while let Some(entry) = entries.next_if(|e| e.dir == dir) {
                    println!("    {}", entry.name);
                }
            }
        }
        Command::Add { host_path, name } => {
            let name = match name {
                Some(name) => name,
                None => default_name(&host_path),
            };
            let inode_id = fs.import(&host_path, &name)?;
            let inode = fs.get_inode(inode_id)?;
            println!(
                "{} -> {} ({} bytes, {} blocks)",
                host_path.display(),
                name,
                inode.size,
                inode.num_blocks()
            );
        }
        Command::Rm { name } => fs.delete(&name)?,
        Command::Extract { name, out } => {
            let out = out.unwrap_or_else(|| PathBuf::from(name.trim_start_matches('/')));
            let written = fs.export(&name, &out)?;
            println!("{} -> {} ({} bytes)", name, out.display(), written);
        }
        Command::Mkdir { name } => {
            fs.mkdir(&name)?;
        }
        Command::Rmdir { name } => fs.remove_dir(&name)?,
        Command::Cat { name } => {
            use std::io::Write;
            let data = fs.read_file(&name)?;
            std::io::stdout().write_all(&data)?;
        }
        Command::Df => {
            let usage = fs.usage()?;
            println!(
                "blocks: {} used, {} free ({} bytes each)",
                usage.used_blocks, usage.free_blocks, BLOCK_SIZE
            );
            println!("inodes: {} used, {} free", usage.used_inodes, usage.free_inodes);
            println!("mapped: {} bytes", fs.region().len());
        }
    }
    fs.flush()?;
    Ok(())
}

#[cfg(unix)]
fn default_name(host_path: &std::path::Path) -> String {
    let raw = host_path.to_string_lossy();
    let trimmed = raw.trim_start_matches("./").trim_start_matches('/');
    format!("/{}", trimmed)
}

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use fwpkg_core::producer::write_package;
use fwpkg_core::{Compatibility, FirmwarePackageConsumer, Manifest};

#[derive(Parser)]
#[command(name = "fwpkg", version, about = "Inspect, extract and build firmware packages")]
struct Cli {
    /// Log debug output to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the manifest of a package
    Info {
        package: PathBuf,
        /// Print the manifest as JSON, including keys fwpkg does not interpret
        #[arg(long)]
        json: bool,
        /// Also list the archive entries
        #[arg(long)]
        entries: bool,
    },
    /// Write the firmware binary to a file, or to stdout
    Extract {
        package: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check that a package targets the given hardware and major revision
    Check {
        package: PathBuf,
        #[arg(long)]
        hw: String,
        #[arg(long)]
        rev: String,
    },
    /// Build a package from a firmware image
    Create {
        #[arg(long)]
        name: String,
        #[arg(long = "fw-version")]
        fw_version: String,
        #[arg(long)]
        hw: String,
        /// Compatible major hardware revision (repeatable)
        #[arg(long = "rev", required = true)]
        revs: Vec<String>,
        /// Name of the binary inside the package (default: the image's file name)
        #[arg(long)]
        file_name: Option<String>,
        #[arg(short, long)]
        output: PathBuf,
        firmware: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Cmd::Info { package, json, entries } => info(&package, json, entries)?,
        Cmd::Extract { package, output } => extract(&package, output.as_deref())?,
        Cmd::Check { package, hw, rev } => check(&package, &hw, &rev)?,
        Cmd::Create { name, fw_version, hw, revs, file_name, output, firmware } => {
            create(name, fw_version, hw, revs, file_name, &output, &firmware)?
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("fwpkg=debug,fwpkg_core=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("fwpkg=warn,fwpkg_core=warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(io::stderr).init();
}

fn open(package: &Path) -> Result<FirmwarePackageConsumer<'static>> {
    tracing::debug!(package = %package.display(), "opening package");
    FirmwarePackageConsumer::from_path(package)
        .with_context(|| format!("{} is not a valid firmware package", package.display()))
}

fn info(package: &Path, as_json: bool, list: bool) -> Result<()> {
    let mut pkg = open(package)?;
    let m = pkg.manifest();
    if as_json {
        println!("{}", serde_json::to_string_pretty(m)?);
    } else {
        println!("name:       {}", m.name);
        println!("version:    {}", m.version);
        println!("file:       {}", m.file);
        println!("hw:         {}", m.compatibility.hw);
        println!("major_revs: {}", m.compatibility.major_revs.join(", "));
    }
    if list {
        for e in pkg.entries()? {
            println!("  {:40} {:>12} bytes", e.name, e.size);
        }
    }
    Ok(())
}

/// Forwards writes and hashes everything that passes through.
struct HashingWriter<W> {
    inner: W,
    hasher: blake3::Hasher,
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn extract(package: &Path, output: Option<&Path>) -> Result<()> {
    let mut pkg = open(package)?;
    let file = pkg.manifest().file.clone();
    tracing::debug!(file = %file, output = ?output, "extracting firmware binary");
    let (n, digest) = match output {
        Some(out) => {
            let f = File::create(out).with_context(|| format!("create {}", out.display()))?;
            let mut w = HashingWriter { inner: BufWriter::new(f), hasher: blake3::Hasher::new() };
            let res = pkg.file(&mut w).map_err(anyhow::Error::from).and_then(|n| {
                w.flush()?;
                Ok(n)
            });
            match res {
                Ok(n) => (n, w.hasher.finalize()),
                Err(e) => {
                    drop(w);
                    let _ = fs::remove_file(out);
                    return Err(e);
                }
            }
        }
        None => {
            let stdout = io::stdout();
            let mut w = HashingWriter { inner: stdout.lock(), hasher: blake3::Hasher::new() };
            let n = pkg.file(&mut w)?;
            w.flush()?;
            (n, w.hasher.finalize())
        }
    };
    eprintln!("Extracted {} ({} bytes, blake3 {})", file, n, digest.to_hex());
    Ok(())
}

fn check(package: &Path, hw: &str, rev: &str) -> Result<()> {
    let pkg = open(package)?;
    let m = pkg.manifest();
    if m.is_compatible(hw, rev) {
        println!("Compatible: YES");
        return Ok(());
    }
    println!("Compatible: NO");
    bail!(
        "{} {} targets hw {:?} revs [{}], not hw {:?} rev {:?}",
        m.name,
        m.version,
        m.compatibility.hw,
        m.compatibility.major_revs.join(", "),
        hw,
        rev
    )
}

fn create(
    name: String,
    version: String,
    hw: String,
    major_revs: Vec<String>,
    file_name: Option<String>,
    output: &Path,
    firmware: &Path,
) -> Result<()> {
    let file = match file_name {
        Some(f) => f,
        None => firmware
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .with_context(|| format!("no file name in {}", firmware.display()))?,
    };
    let manifest = Manifest {
        name,
        version,
        file,
        compatibility: Compatibility { hw, major_revs, ..Default::default() },
        ..Default::default()
    };
    manifest.validate().context("invalid manifest")?;

    let image = File::open(firmware).with_context(|| format!("open {}", firmware.display()))?;
    let len = image.metadata()?.len();
    tracing::debug!(firmware = %firmware.display(), bytes = len, entry = %manifest.file, "packing image");
    let out = File::create(output).with_context(|| format!("create {}", output.display()))?;
    let res = write_package(BufWriter::new(out), &manifest, image, len)
        .with_context(|| format!("write {}", output.display()))
        .and_then(|mut w| {
            w.flush()?;
            Ok(())
        });
    if let Err(e) = res {
        // A partial package must not outlive a failed write.
        let _ = fs::remove_file(output);
        return Err(e);
    }
    eprintln!("Wrote {} ({} {}, {} byte image)", output.display(), manifest.name, manifest.version, len);
    Ok(())
}

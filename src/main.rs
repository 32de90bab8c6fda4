//! Host-side helper: builds the WASM site and serves `static/`, lists the
//! filter presets, or runs the filter pipeline over a still image.

#[cfg(not(target_arch = "wasm32"))]
mod host {
    use std::path::{Path, PathBuf};
    use std::process::{Command, Stdio};
    use std::rc::Rc;

    use anyhow::{bail, Context};
    use clap::{Parser, Subcommand};
    use tracing::{info, warn};

    use camfilter_wasm::error::FilterKind;
    use camfilter_wasm::selection::FilterSelection;
    use camfilter_wasm::software::SoftwareSurface;
    use camfilter_wasm::{App, Config, FilterCatalog};

    #[derive(Parser)]
    #[command(name = "camfilter")]
    #[command(about = "Live camera convolution and color filters in the browser")]
    #[command(version)]
    struct Cli {
        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Build the WASM bundle into static/pkg and serve static/ locally
        Serve {
            /// Port for the local HTTP server
            #[arg(short, long, default_value = "8000")]
            port: u16,

            /// Serve the existing bundle without running wasm-pack
            #[arg(long)]
            skip_build: bool,

            /// Also expose the site through ngrok
            #[arg(long)]
            tunnel: bool,
        },

        /// List the convolution and color presets
        Filters,

        /// Apply a filter pair to an image file
        Preview {
            input: PathBuf,
            output: PathBuf,

            /// Convolution preset
            #[arg(long, default_value = "none")]
            convolution: String,

            /// Color preset
            #[arg(long, default_value = "none")]
            color: String,
        },
    }

    pub fn run() -> anyhow::Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive("camfilter_wasm=info".parse()?),
            )
            .init();

        match Cli::parse().command {
            Commands::Serve {
                port,
                skip_build,
                tunnel,
            } => serve(port, skip_build, tunnel),
            Commands::Filters => {
                list_filters();
                Ok(())
            }
            Commands::Preview {
                input,
                output,
                convolution,
                color,
            } => preview(&input, &output, convolution, color),
        }
    }

    fn serve(port: u16, skip_build: bool, tunnel: bool) -> anyhow::Result<()> {
        if !skip_build {
            info!("building WASM pkg");
            let status = Command::new("wasm-pack")
                .args(["build", "--release", "--target", "web", "--out-dir", "static/pkg"])
                .status()
                .context("wasm-pack not found in PATH (https://rustwasm.github.io/wasm-pack/)")?;
            if !status.success() {
                bail!("wasm-pack finished with {status}");
            }
        }

        info!("serving static/ at http://127.0.0.1:{port}");
        let mut server = Command::new("python3")
            .args(["-m", "http.server", &port.to_string(), "--directory", "static"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("failed to start http server")?;

        if tunnel {
            let ngrok = Command::new("ngrok")
                .args(["http", &port.to_string()])
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .spawn();
            match ngrok {
                Ok(_) => info!("ngrok tunnel starting"),
                Err(_) => warn!("ngrok not found; install it to expose the site over the internet"),
            }
        }

        let status = server.wait()?;
        if !status.success() {
            bail!("http server exited with {status}");
        }
        Ok(())
    }

    fn list_filters() {
        let catalog = FilterCatalog::builtin();
        println!("convolution:");
        for name in catalog.names(FilterKind::Convolution) {
            if let Ok(kernel) = catalog.kernel(name) {
                println!("  {name:<12} {:?}", kernel.weights());
            }
        }
        println!("color:");
        for name in catalog.names(FilterKind::Color) {
            if let Ok(matrix) = catalog.color(name) {
                println!("  {name:<12} {:?}", matrix.elements());
            }
        }
    }

    fn preview(
        input: &Path,
        output: &Path,
        convolution: String,
        color: String,
    ) -> anyhow::Result<()> {
        let frame = image::open(input)
            .with_context(|| format!("failed to read {}", input.display()))?
            .to_rgba8();
        let (width, height) = frame.dimensions();

        let config = Config::default()
            .with_filters(convolution.clone(), color.clone())
            .with_capture_size(width, height);
        let selection = Rc::new(FilterSelection::new(convolution, color));
        let app = App::new(config, selection)?;

        let surface = SoftwareSurface::new(width, height);
        let mut render_loop = app.launch(&surface, frame)?;
        if render_loop.tick()?.is_break() {
            bail!("render loop stopped before drawing a frame");
        }

        surface
            .context()
            .read_pixels()
            .save(output)
            .with_context(|| format!("failed to write {}", output.display()))?;
        info!(width, height, output = %output.display(), "preview written");
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    host::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {}

use std::path::PathBuf;
use std::process;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tilewm::actor::reactor::{
    AttachWindow, LayoutSnapshot, Reactor, ResizeFocusedWindow, WindowClosed, WindowFocused,
    WmState,
};
use tilewm::common::config::{Config, config_file, restore_file};
use tilewm::common::log;
use tilewm::layout_engine::{ResizeDirection, WindowFrame};
use tilewm::model::container::ContainerType;
use tilewm::sys::geometry::Rect;
use tilewm::sys::window::{RecordingWindowService, WindowHandle, WindowService};
use tracing::info;

#[derive(Parser)]
#[command(about = "Build, inspect and drive a tiling layout")]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Layout file to read and update (defaults to the restore file).
    #[arg(long, value_name = "PATH")]
    layout: Option<PathBuf>,

    /// Apply the command without writing the layout back.
    #[arg(long)]
    dry_run: bool,

    /// Print window frames as JSON instead of the layout tree.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a fresh layout with one monitor and the configured workspaces.
    Init {
        /// Monitor size as WIDTHxHEIGHT.
        #[arg(long, default_value = "1920x1080", value_parser = parse_size)]
        monitor: Rect,
        /// Number of windows to open on the first workspace.
        #[arg(long, default_value_t = 0)]
        windows: u64,
    },
    /// Print the layout tree and the frame of every window.
    Show,
    /// Open a window next to the focused one.
    Open {
        /// Handle of the new window; defaults to one past the largest in use.
        handle: Option<u64>,
    },
    /// Resize the focused window.
    Resize {
        /// grow-width, grow-height, shrink-width or shrink-height.
        direction: ResizeDirection,
        #[arg(long, default_value_t = 1)]
        times: u32,
    },
    /// Focus a window by handle.
    Focus { handle: u64 },
    /// Close a window by handle.
    Close { handle: u64 },
    /// Check whether the configuration file is valid.
    CheckConfig,
}

fn main() {
    let opt = Cli::parse();
    log::init_logging();

    if let Err(e) = run(opt) {
        eprintln!("{e:#}");
        process::exit(1);
    }
}

fn run(opt: Cli) -> anyhow::Result<()> {
    let config_path = opt.config.clone().unwrap_or_else(config_file);

    if let Commands::CheckConfig = opt.command {
        return check_config(&config_path);
    }

    let config = Config::read_or_default(&config_path)?;
    let issues = config.validate();
    if !issues.is_empty() {
        bail!("invalid config {}:\n{}", config_path.display(), issues.join("\n"));
    }

    let layout_path = opt.layout.clone().unwrap_or_else(restore_file);
    let service = RecordingWindowService::new();
    let mut reactor = match opt.command {
        Commands::Init { monitor, windows } => {
            let mut state = WmState::new(config.settings.layout, Box::new(service.clone()));
            state.add_monitor("main", monitor, &config.settings.workspace_names)?;
            let workspace = state.active_workspace().context("no workspaces configured")?;
            let mut reactor = Reactor::new(state);
            for handle in 1..=windows {
                let handle = WindowHandle(handle);
                reactor.dispatch(AttachWindow { handle, parent: workspace, index: usize::MAX })?;
            }
            reactor
        }
        _ => {
            let snapshot = LayoutSnapshot::load(&layout_path)
                .context("no usable layout; run `tilewm init` first")?;
            Reactor::restore(snapshot, config.settings.layout, Box::new(service.clone()))
        }
    };
    reactor.redraw_all()?;

    match opt.command {
        Commands::Init { .. } | Commands::Show | Commands::CheckConfig => {}
        Commands::Open { handle } => {
            let handle = handle.map(WindowHandle).unwrap_or_else(|| next_handle(&reactor));
            open(&mut reactor, handle)?;
        }
        Commands::Resize { direction, times } => {
            for _ in 0..times {
                let response = reactor.dispatch(ResizeFocusedWindow { direction })?;
                if let Some(error) = response.error {
                    bail!("resize failed: {error}");
                }
            }
        }
        Commands::Focus { handle } => {
            let handle = managed(&reactor, handle)?;
            reactor.publish(WindowFocused { handle })?;
        }
        Commands::Close { handle } => {
            let handle = managed(&reactor, handle)?;
            reactor.publish(WindowClosed { handle })?;
        }
    }

    if opt.json {
        println!("{}", serde_json::to_string_pretty(&frames(&reactor, &service))?);
    } else {
        print_layout(&reactor, &service);
    }

    if !opt.dry_run {
        reactor.snapshot().save(&layout_path)?;
        info!(path = %layout_path.display(), "saved layout");
    }
    Ok(())
}

fn check_config(path: &std::path::Path) -> anyhow::Result<()> {
    if !path.exists() {
        println!("No config at {}; defaults will be used", path.display());
        return Ok(());
    }
    let issues = Config::read(path)?.validate();
    if issues.is_empty() {
        println!("Config validation passed");
        return Ok(());
    }
    for issue in &issues {
        eprintln!("{issue}");
    }
    bail!("{} issue(s) found", issues.len())
}

/// Opens `handle` after the focused window, or at the end of the active
/// workspace when no window is focused.
fn open(reactor: &mut Reactor, handle: WindowHandle) -> anyhow::Result<()> {
    let state = reactor.state();
    let map = state.tree.map();
    let (parent, index) = match state.focused {
        Some(focused) if state.tree.ty(focused) == Some(ContainerType::Window) => {
            let parent = focused.parent(map).context("focused window is detached")?;
            (parent, focused.index(map).map_or(usize::MAX, |i| i + 1))
        }
        _ => (state.active_workspace().context("layout has no workspace")?, usize::MAX),
    };
    let response = reactor.dispatch(AttachWindow { handle, parent, index })?;
    if let Some(error) = response.error {
        bail!("{error}");
    }
    Ok(())
}

fn next_handle(reactor: &Reactor) -> WindowHandle {
    let tree = &reactor.state().tree;
    let max = tree.windows().filter_map(|w| tree.kind(w)?.window_handle()).map(|h| h.0).max();
    WindowHandle(max.map_or(1, |m| m + 1))
}

fn managed(reactor: &Reactor, handle: u64) -> anyhow::Result<WindowHandle> {
    let handle = WindowHandle(handle);
    if reactor.state().tree.find_window(handle).is_none() {
        bail!("window {} is not managed", handle.0);
    }
    Ok(handle)
}

/// Frames the window service currently holds, in layout order.
fn frames(reactor: &Reactor, service: &RecordingWindowService) -> Vec<WindowFrame> {
    let tree = &reactor.state().tree;
    tree.windows()
        .filter_map(|container| {
            let handle = tree.kind(container)?.window_handle()?;
            let frame = service.frame(handle)?;
            Some(WindowFrame { container, handle, frame })
        })
        .collect()
}

fn print_layout(reactor: &Reactor, service: &RecordingWindowService) {
    let state = reactor.state();
    for &monitor in state.tree.monitors() {
        print!("{}", state.tree.draw_tree(monitor));
    }
    let focused = state.focused_window();
    for WindowFrame { handle, frame: r, .. } in frames(reactor, service) {
        let marker = if focused == Some(handle) { "*" } else { " " };
        println!("{marker} {:>4} {}x{}+{}+{}", handle.0, r.width, r.height, r.x, r.y);
    }
}

fn parse_size(s: &str) -> Result<Rect, String> {
    let (w, h) = s.split_once('x').ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let width: i32 = w.trim().parse().map_err(|e| format!("bad width {w:?}: {e}"))?;
    let height: i32 = h.trim().parse().map_err(|e| format!("bad height {h:?}: {e}"))?;
    if width <= 0 || height <= 0 {
        return Err(format!("monitor size must be positive, got {s}"));
    }
    Ok(Rect::new(0, 0, width, height))
}

/// A default 'anyhow' based result type
type Result<T> = anyhow::Result<T>;
use anyhow::Context;
use horizonwm::{
    bar::{Bar, BarModule},
    config::{cmd, Config},
    draw::XcbCanvas,
    helpers::local_offset,
    menu::RofiMenu,
    modules::{self, ModuleContext},
    spawn::{SystemSpawner, Spawner},
    status::{start_workers, StatusState},
    swallow::ProcFs,
    Services, WindowManager, XcbConnection,
};
use simplelog::{LevelFilter, SimpleLogger, WriteLogger};
use std::{env, fs::File, process, str::FromStr, sync::Arc, time::Duration};

const USAGE: &str = "usage: horizonwm [-v]";

fn init_logging() -> Result<()> {
    let level = env::var("HORIZONWM_LOG")
        .ok()
        .and_then(|l| LevelFilter::from_str(&l).ok())
        .unwrap_or(LevelFilter::Info);

    match env::var_os("HORIZONWM_LOG_FILE") {
        Some(path) => {
            let file = File::create(&path).with_context(|| format!("cannot create log file {:?}", path))?;
            WriteLogger::init(level, simplelog::Config::default(), file)?;
        }
        None => SimpleLogger::init(level, simplelog::Config::default())?,
    }
    Ok(())
}

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    match (args.next(), args.next()) {
        (None, _) => (),
        (Some(flag), None) if flag == "-v" => {
            println!("horizonwm-{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    }

    // -- logging --
    init_logging()?;

    // the local offset can only be read while this is the only thread
    let offset = local_offset();
    let config = Config::default();

    let conn = XcbConnection::new()?;
    conn.register_wm()?;

    let spawner: Arc<dyn Spawner> = Arc::new(SystemSpawner);
    let status = StatusState::new(Arc::clone(&spawner), cmd::CHECK_UPDATES);

    let ctx = ModuleContext {
        spawner: Arc::clone(&spawner),
        status: status.clone(),
        commands: config.module_commands(),
        accents: config.accents,
        keyboard_layouts: config.keyboard_layouts,
        battery_dir: config.battery_dir.clone(),
        backlight_dir: config.backlight_dir.clone(),
        offset,
    };
    let bar_modules: Vec<(Box<dyn BarModule>, u64)> = config
        .modules
        .iter()
        .map(|&(kind, period)| (modules::build(kind, &ctx), period))
        .collect();

    let canvas = XcbCanvas::new(config.font)?;
    let bar = Arc::new(Bar::new(Box::new(canvas), bar_modules, config.bar_style()));

    let redraw_bar = Arc::clone(&bar);
    start_workers(
        &status,
        Arc::clone(&spawner),
        config.worker_commands(),
        Duration::from_secs(config.bar_refresh_secs),
        move || redraw_bar.draw_all(),
    )?;

    let services = Services {
        menu: Box::new(RofiMenu::new(Arc::clone(&spawner), config.menu_location)),
        procs: Box::new(ProcFs::default()),
        spawner,
        bar,
        status,
        offset,
    };

    let mut wm = WindowManager::new(conn, config, services)?;
    wm.run()?;

    log::info!("bye");
    Ok(())
}

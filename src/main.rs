use anyhow::Result;
use clap::{ArgGroup, Parser};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
mod config;
mod error;
mod events;
pub mod mappings;
mod services;
mod utils;

use config::Config;
use events::TargetSpec;
use services::{
    create_display, create_tray, wait_for_termination, EventLoop, HotkeyBinder, Session,
    ShutdownCoordinator, TrayAdapter, TrayExit, VisibilityController, WindowLocator,
};

#[derive(Parser, Debug)]
#[command(name = "wintoggle")]
#[command(about = "Скрывает и показывает окно X11 по горячей клавише или из трея")]
#[command(group(ArgGroup::new("target").required(true).args(["title", "id"])))]
struct Args {
    /// Подстрока заголовка окна (без учёта регистра)
    #[arg(short, long)]
    title: Option<String>,

    /// Идентификатор окна: десятичный или с префиксом 0x
    #[arg(short, long)]
    id: Option<String>,

    /// Горячая клавиша, например ctrl+shift+a
    #[arg(short, long)]
    key: Option<String>,

    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "wintoggle.toml")]
    config: String,

    /// Режим сухого запуска (без реальных действий)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (перекрывает конфигурацию)
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn target(&self) -> Option<TargetSpec> {
        match (&self.title, &self.id) {
            (Some(title), _) => Some(TargetSpec::Title(title.clone())),
            (None, Some(id)) => Some(TargetSpec::Id(id.clone())),
            (None, None) => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Загрузка конфигурации
    let config = Config::load(&args.config)?;

    // Инициализация системы логирования
    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(level, &config.logging.format)?;

    info!("Запуск wintoggle v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - реальные действия отключены");
    }

    let target = args
        .target()
        .ok_or_else(|| anyhow::anyhow!("Нужно указать --title или --id"))?;

    // Без соединения работать нечему
    let display = create_display(args.dry_run)?;
    let session = Arc::new(Session::new(display.clone(), target));

    let locator = WindowLocator::new(display.clone());
    match locator.resolve(session.target()) {
        Ok(window) => session.set_target_window(Some(window)),
        Err(e) => {
            error!("Окно не найдено: {} ({})", session.target(), e);
            print_lookup_help(&locator, &session);
            display.close();
            return Ok(());
        }
    }

    let visibility = Arc::new(VisibilityController::new(session.clone()));
    visibility.sync();
    let visibility_changes = visibility.subscribe();

    let ignored = config.hotkey.ignored_modifiers();
    if let Some(combo) = args.key.as_deref().or(config.hotkey.combo.as_deref()) {
        start_hotkey(&session, &visibility, combo, ignored);
    }

    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let menu = TrayAdapter::menu(&session, &config.tray.icon_name);
    let tray = create_tray(menu, commands_tx)?;

    let coordinator = Arc::new(ShutdownCoordinator::new(session.clone(), Some(tray.clone())));
    tokio::spawn({
        let coordinator = coordinator.clone();
        async move {
            wait_for_termination().await;
            coordinator.shutdown().await;
        }
    });

    info!("Все компоненты запущены, цель: {}", session.describe_target());

    let mut adapter = TrayAdapter::new(session.clone(), visibility, tray, visibility_changes);
    match adapter.run(commands_rx).await {
        TrayExit::Quit => info!("Выход из трея"),
        TrayExit::Cancelled => info!("Трей остановлен сигналом"),
    }

    coordinator.shutdown().await;

    info!("wintoggle завершил работу");
    Ok(())
}

/// Горячая клавиша необязательна: ошибки только логируются
fn start_hotkey(
    session: &Arc<Session>,
    visibility: &Arc<VisibilityController>,
    combo: &str,
    ignored: events::Modifiers,
) {
    let binder = HotkeyBinder::new(session.clone(), ignored);
    if let Err(e) = binder.bind(combo) {
        warn!("Горячая клавиша '{}' не зарегистрирована: {}", combo, e);
        return;
    }

    let event_loop = match EventLoop::new(session.clone(), visibility.clone(), ignored) {
        Ok(event_loop) => event_loop,
        Err(e) => {
            warn!("Цикл событий не создан: {}", e);
            return;
        }
    };

    if let Err(e) = event_loop.spawn() {
        warn!("Цикл событий не запущен: {}", e);
    }
}

fn print_lookup_help(locator: &WindowLocator, session: &Session) {
    eprintln!("Window not found: {}", session.target().raw());
    println!("\nTip: The window might be:");
    println!("1. Not currently open");
    println!("2. Using a different title than expected");
    println!("3. Not accessible to this program");

    println!("\nAvailable windows:");
    println!("----------------");
    for window in locator.list_all(session.root()) {
        println!("{}", window);
    }
    println!("----------------");
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .init(),
    }

    Ok(())
}

use crate::error::Result;
use crate::utils::icon;
use ksni::menu::{MenuItem, StandardItem};
use ksni::{Icon, Status, ToolTip, Tray, TrayService};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::r#trait::{TrayCommand, TrayMenu, TrayUi};

/// Модель трея для ksni. Клики по меню превращаются в `TrayCommand`
struct ToggleTray {
    menu: TrayMenu,
    tooltip: String,
    icon: Icon,
    commands: mpsc::UnboundedSender<TrayCommand>,
}

impl ToggleTray {
    fn send(&self, command: TrayCommand) {
        if self.commands.send(command).is_err() {
            debug!("Получатель команд трея уже закрыт, {:?} пропущена", command);
        }
    }
}

impl Tray for ToggleTray {
    fn id(&self) -> String {
        env!("CARGO_PKG_NAME").to_string()
    }

    fn title(&self) -> String {
        self.menu.title.clone()
    }

    fn status(&self) -> Status {
        Status::Active
    }

    fn icon_name(&self) -> String {
        self.menu.icon_name.clone()
    }

    fn icon_pixmap(&self) -> Vec<Icon> {
        vec![self.icon.clone()]
    }

    fn tool_tip(&self) -> ToolTip {
        ToolTip {
            icon_name: String::new(),
            icon_pixmap: Vec::new(),
            title: self.tooltip.clone(),
            description: String::new(),
        }
    }

    fn menu(&self) -> Vec<MenuItem<Self>> {
        let mut items: Vec<MenuItem<Self>> = vec![StandardItem {
            label: self.menu.toggle_label.clone(),
            activate: Box::new(|tray: &mut Self| tray.send(TrayCommand::Toggle)),
            ..Default::default()
        }
        .into()];

        if let Some(shortcut) = &self.menu.shortcut {
            items.push(
                StandardItem {
                    label: format!("Shortcut: {}", shortcut),
                    enabled: false,
                    ..Default::default()
                }
                .into(),
            );
        }

        items.push(MenuItem::Separator);
        items.push(
            StandardItem {
                label: "Quit".to_string(),
                activate: Box::new(|tray: &mut Self| tray.send(TrayCommand::Quit)),
                ..Default::default()
            }
            .into(),
        );

        items
    }
}

/// StatusNotifierItem-трей; сервис ksni работает в своём потоке
pub struct KsniTray {
    handle: ksni::Handle<ToggleTray>,
}

impl KsniTray {
    pub fn spawn(menu: TrayMenu, commands: mpsc::UnboundedSender<TrayCommand>) -> Result<Self> {
        let glyph = icon::window_glyph();
        let tray = ToggleTray {
            tooltip: menu.tooltip.clone(),
            menu,
            icon: Icon {
                width: glyph.width,
                height: glyph.height,
                data: glyph.argb,
            },
            commands,
        };

        let service = TrayService::new(tray);
        let handle = service.handle();

        std::thread::Builder::new()
            .name("tray".to_string())
            .spawn(move || match service.run() {
                Ok(()) => info!("Трей остановлен"),
                Err(e) => error!("Ошибка сервиса трея: {}", e),
            })?;

        info!("Трей запущен");
        Ok(Self { handle })
    }
}

impl TrayUi for KsniTray {
    fn set_tooltip(&self, tooltip: String) {
        self.handle.update(move |tray: &mut ToggleTray| {
            tray.tooltip = tooltip;
        });
    }

    fn quit(&self) {
        debug!("Останавливаем сервис трея");
        self.handle.shutdown();
    }
}

use std::time::Duration;

use engine_logging::{engine_debug, engine_trace};
use rand::RngCore;
use tubesweep_core::{ActionAttempt, ActionStep, Pacing};

use crate::dom::{DomElement, DomError, DomPage, ElementHandle};

/// Menu trigger lookups, tried in order.
const MENU_TRIGGERS: [&str; 2] = ["button", ".yt-lockup-metadata-view-model__menu-button"];
const MENU_POPUP: &str = "#contentWrapper";
const MENU_ITEMS: &str = "ytd-menu-service-item-renderer,yt-list-item-view-model";

#[derive(Debug, Clone)]
pub struct ActionSettings {
    pub pacing: Pacing,
    pub max_restarts: u32,
    /// How often an empty popup is read again before the step fails.
    pub menu_read_attempts: u32,
    pub menu_read_delay: Duration,
    /// Small wheel scroll (dx, dy, steps) that wakes up lazy overlays.
    pub nudge: (f64, f64, u32),
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            pacing: Pacing::default(),
            max_restarts: 5,
            menu_read_attempts: 5,
            menu_read_delay: Duration::from_millis(200),
            nudge: (0.0, 12.0, 3),
        }
    }
}

/// Drives one [`ActionAttempt`] against the page: open the record's menu
/// and click the entry carrying `label`.
pub struct MenuAction<'a> {
    page: &'a dyn DomPage,
    settings: &'a ActionSettings,
    rng: &'a mut (dyn RngCore + Send),
}

/// Handles captured by earlier steps of the current sequence.
#[derive(Default)]
struct Captured {
    menu: Option<ElementHandle>,
    item: Option<ElementHandle>,
}

impl<'a> MenuAction<'a> {
    pub fn new(
        page: &'a dyn DomPage,
        settings: &'a ActionSettings,
        rng: &'a mut (dyn RngCore + Send),
    ) -> Self {
        Self {
            page,
            settings,
            rng,
        }
    }

    /// Runs the sequence to `Done` or `Failed`. Only a lost session is
    /// returned as an error; every other failure restarts the sequence.
    pub async fn run(&mut self, target: &dyn DomElement, label: &str) -> Result<ActionAttempt, DomError> {
        let mut attempt = ActionAttempt::new(self.settings.max_restarts);
        let mut captured = Captured::default();

        while !attempt.is_finished() {
            let pause = self.settings.pacing.pick(&mut *self.rng);
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }

            let step = attempt.step();
            let outcome = match step {
                ActionStep::Stabilize => {
                    captured = Captured::default();
                    self.stabilize().await
                }
                ActionStep::OpenMenu => self.open_menu(target).await,
                ActionStep::SelectMenu => self.select_menu().await.map(|menu| {
                    captured.menu = Some(menu);
                }),
                ActionStep::ReadMenuItems => match captured.menu.as_deref() {
                    Some(menu) => self.read_menu_items(menu, label).await.map(|item| {
                        captured.item = Some(item);
                    }),
                    None => Err(StepError::Missing("menu popup".into())),
                },
                ActionStep::ClickItem => match captured.item.as_deref() {
                    Some(item) => self.click_item(item).await,
                    None => Err(StepError::Missing("menu item".into())),
                },
                ActionStep::Done | ActionStep::Failed => break,
            };

            match outcome {
                Ok(()) => {
                    engine_trace!("Action step {} done", step);
                    attempt.advance();
                }
                Err(StepError::Dom(err)) if err.is_fatal() => return Err(err),
                Err(err) => {
                    engine_debug!("Action step {} failed: {}", step, err);
                    attempt.fail(err.to_string());
                }
            }
        }

        // A failed sequence may end with its popup still open.
        if attempt.step() == ActionStep::Failed {
            if let Err(err) = self.page.press_escape().await {
                if err.is_fatal() {
                    return Err(err);
                }
                engine_debug!("Closing the menu after a failed action: {}", err);
            }
        }

        Ok(attempt)
    }

    async fn stabilize(&mut self) -> Result<(), StepError> {
        self.page.press_escape().await?;
        let (dx, dy, steps) = self.settings.nudge;
        self.page.scroll_by(dx, dy, steps).await?;
        Ok(())
    }

    async fn open_menu(&mut self, target: &dyn DomElement) -> Result<(), StepError> {
        for selector in MENU_TRIGGERS {
            if let Some(trigger) = target.query(selector).await? {
                trigger.click().await?;
                return Ok(());
            }
        }
        Err(StepError::Missing("menu trigger".into()))
    }

    async fn select_menu(&mut self) -> Result<ElementHandle, StepError> {
        for candidate in self.page.query_all(MENU_POPUP).await? {
            if candidate.is_visible().await? {
                return Ok(candidate);
            }
        }
        Err(StepError::Missing("visible menu popup".into()))
    }

    async fn read_menu_items(&mut self, menu: &dyn DomElement, label: &str) -> Result<ElementHandle, StepError> {
        let wanted = normalize(label);
        for read in 1..=self.settings.menu_read_attempts.max(1) {
            let items = menu.query_all(MENU_ITEMS).await?;
            if items.is_empty() {
                engine_trace!("Menu popup still empty (read {})", read);
                tokio::time::sleep(self.settings.menu_read_delay).await;
                continue;
            }
            let mut seen = Vec::with_capacity(items.len());
            for item in items {
                let text = normalize(&item.text().await?);
                if text == wanted {
                    return Ok(item);
                }
                seen.push(text);
            }
            return Err(StepError::LabelAbsent {
                label: label.to_string(),
                seen,
            });
        }
        Err(StepError::Missing("menu items".into()))
    }

    async fn click_item(&mut self, item: &dyn DomElement) -> Result<(), StepError> {
        let (x, y) = item
            .bounding_box()
            .await?
            .and_then(|rect| rect.click_point(&mut *self.rng))
            .ok_or_else(|| StepError::Missing("clickable menu item box".into()))?;
        self.page.click_at(x, y).await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
enum StepError {
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error("{0} not found")]
    Missing(String),
    #[error("menu has no '{label}' entry (saw {seen:?})")]
    LabelAbsent { label: String, seen: Vec<String> },
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

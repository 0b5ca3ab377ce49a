//! Poster authoring wizard: photo → caption → ticket link → confirm
//!
//! Each step accepts exactly one input kind; anything else re-prompts without
//! advancing. Validation happens only at confirm, and a failed confirm keeps
//! the draft alive so the admin can cancel or retry.

use crate::core::validation::{validate_caption, validate_ticket_url};

/// Current step of a poster draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftStep {
    Photo,
    Caption,
    TicketUrl,
    Confirm,
}

/// An in-progress poster; dropped whenever the session leaves the wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosterDraft {
    pub step: DraftStep,
    pub file_id: Option<String>,
    pub caption: Option<String>,
    pub ticket_url: Option<String>,
}

/// A draft that passed confirm-time validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPoster {
    pub file_id: String,
    pub caption: String,
    pub ticket_url: Option<String>,
}

/// Outcome of feeding one input into the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Input accepted; the draft moved to `step`.
    Advanced(DraftStep),
    /// Wrong input kind for the current step; re-prompt, no advance.
    WrongInput(&'static str),
}

impl PosterDraft {
    pub fn new() -> Self {
        Self {
            step: DraftStep::Photo,
            file_id: None,
            caption: None,
            ticket_url: None,
        }
    }

    /// The prompt for the current step.
    pub fn prompt(&self) -> &'static str {
        match self.step {
            DraftStep::Photo => "Шаг 1/4: пришлите фото афиши",
            DraftStep::Caption => "Шаг 2/4: пришлите текст афиши",
            DraftStep::TicketUrl => "Шаг 3/4: пришлите ссылку на билеты (или «-», если без ссылки)",
            DraftStep::Confirm => "Шаг 4/4: всё готово, подтвердите публикацию",
        }
    }

    /// Feeds a photo into the draft; accepted only at the photo step.
    pub fn accept_photo(&mut self, file_id: &str) -> StepOutcome {
        match self.step {
            DraftStep::Photo => {
                self.file_id = Some(file_id.to_string());
                self.step = DraftStep::Caption;
                StepOutcome::Advanced(self.step)
            }
            _ => StepOutcome::WrongInput("Фото здесь не нужно. "),
        }
    }

    /// Feeds free text into the draft; accepted at the caption and
    /// ticket-link steps ("-" skips the link).
    pub fn accept_text(&mut self, text: &str) -> StepOutcome {
        match self.step {
            DraftStep::Caption => {
                self.caption = Some(text.to_string());
                self.step = DraftStep::TicketUrl;
                StepOutcome::Advanced(self.step)
            }
            DraftStep::TicketUrl => {
                let trimmed = text.trim();
                self.ticket_url = if trimmed == "-" || trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                };
                self.step = DraftStep::Confirm;
                StepOutcome::Advanced(self.step)
            }
            DraftStep::Photo => StepOutcome::WrongInput("Сначала нужно фото. "),
            DraftStep::Confirm => StepOutcome::WrongInput("Черновик уже собран. "),
        }
    }

    /// Confirm-time validation. On failure names the violated rule and leaves
    /// the draft untouched; on success yields the finished poster.
    pub fn confirm(&self) -> Result<NewPoster, String> {
        let file_id = self
            .file_id
            .as_ref()
            .ok_or_else(|| "В черновике нет фото.".to_string())?;
        let caption = self.caption.clone().unwrap_or_default();
        validate_caption(&caption)?;
        if let Some(url) = &self.ticket_url {
            validate_ticket_url(url)?;
        }
        Ok(NewPoster {
            file_id: file_id.clone(),
            caption,
            ticket_url: self.ticket_url.clone(),
        })
    }

    /// Summary shown on the confirm screen.
    pub fn summary(&self) -> String {
        format!(
            "Афиша готова:\n\nТекст: {}\nСсылка: {}",
            self.caption.as_deref().unwrap_or("(без текста)"),
            self.ticket_url.as_deref().unwrap_or("(без ссылки)"),
        )
    }
}

impl Default for PosterDraft {
    fn default() -> Self {
        Self::new()
    }
}

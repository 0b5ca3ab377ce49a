//! Registration state machine: name → gender → age
//!
//! The resume step is derived from persisted data (first missing field), so a
//! half-filled profile can never strand a user on the wrong question.

use crate::storage::db::User;

/// The question currently being asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStep {
    Name,
    Gender,
    Age,
}

impl RegistrationStep {
    /// The prompt shown when entering this step.
    pub fn prompt(self) -> &'static str {
        match self {
            RegistrationStep::Name => "Добро пожаловать! 🎉\n\nДавайте познакомимся. Как вас зовут?",
            RegistrationStep::Gender => "Приятно познакомиться! Укажите ваш пол:",
            RegistrationStep::Age => "Теперь укажите ваш возраст (только число)\nНапример: 18",
        }
    }
}

/// First missing registration field for a (possibly absent) profile,
/// or None when registration is complete.
pub fn resume_step(profile: Option<&User>) -> Option<RegistrationStep> {
    let Some(user) = profile else {
        return Some(RegistrationStep::Name);
    };
    if user.name.as_deref().map(|n| n.trim().is_empty()).unwrap_or(true) {
        return Some(RegistrationStep::Name);
    }
    if user.gender == crate::storage::db::Gender::Unset {
        return Some(RegistrationStep::Gender);
    }
    if !matches!(user.age, Some(a) if (crate::core::validation::MIN_AGE..=crate::core::validation::MAX_AGE).contains(&a))
    {
        return Some(RegistrationStep::Age);
    }
    None
}

//! Read-only question and challenge catalog types.
//!
//! The question bank is an external collaborator; these are the shapes it
//! hands over. Nothing in the engine mutates a catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::round::Track;

/// A multiple-choice quiz question as supplied by the question bank.
///
/// `correct_answer` never leaves the server: response models strip it before
/// questions are shown to a participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: i32,
    pub question: String,
    /// Exactly four options.
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct_answer: usize,
    /// Round 2 questions may be image-based.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_images: Option<Vec<Option<String>>>,
}

/// A Round 3 challenge definition: problem statement plus the unmodified
/// starter templates handed to participants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Challenge {
    pub id: i32,
    pub track: Track,
    pub title: String,
    /// Markdown problem statement.
    pub description: String,
    #[serde(default)]
    pub templates: ChallengeTemplates,
}

/// Starter artifacts for a challenge. DSA challenges carry per-language
/// code templates; web challenges carry an HTML/CSS/JS trio.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ChallengeTemplates {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub code: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js: Option<String>,
}

/// The artifact a participant submits for a Round 3 challenge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Artifact {
    /// A single source file for a DSA challenge.
    Code { language: String, code: String },
    /// A front-end bundle for a web challenge.
    Web { html: String, css: String, js: String },
}

impl Artifact {
    /// The track this artifact shape belongs to.
    pub fn track(&self) -> Track {
        match self {
            Self::Code { .. } => Track::Dsa,
            Self::Web { .. } => Track::Web,
        }
    }

    /// True when the artifact carries no content at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Code { code, .. } => code.trim().is_empty(),
            Self::Web { html, css, js } => {
                html.trim().is_empty() && css.trim().is_empty() && js.trim().is_empty()
            }
        }
    }
}

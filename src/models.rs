use std::sync::Arc;

use crate::cache::AgentCache;
use crate::config::Config;
use crate::db::BrandStore;
use crate::llm::provider::TextGenerator;
use crate::scrape::PageFetcher;

/// Shared application state. The provider, fetcher and store are held as
/// trait objects so route handlers and tests can substitute them.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn BrandStore>,
    pub cache: Arc<AgentCache>,
    pub generator: Arc<dyn TextGenerator>,
    pub fetcher: Arc<dyn PageFetcher>,
}

// Request/response DTOs mirrored from the web client.

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub role: String, // "user" or "assistant"
    pub content: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IncomingMessage {
    pub content: String,
    /// Optional image attachment as a `data:<mime>;base64,...` URL.
    pub image: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AgencyRequest {
    pub brand_id: Option<uuid::Uuid>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub new_message: IncomingMessage,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

// The brand identity aggregate. Field layout follows the eight boxes the
// director persona is instructed to fill; every section is optional in a
// given update and merges additively into the accumulated document.

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BrandDna {
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub usp: String,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TargetAudience {
    #[serde(default)]
    pub demographics: String,
    #[serde(default)]
    pub psychographics: String,
    #[serde(default)]
    pub archetype: String,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ColorPalette {
    #[serde(default)]
    pub primary: String,
    #[serde(default)]
    pub secondary: String,
    #[serde(default)]
    pub accent: String,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Typography {
    #[serde(default)]
    pub heading_font: String,
    #[serde(default)]
    pub body_font: String,
    #[serde(default)]
    pub style_rationale: String,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SloganTone {
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub tone_of_voice: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WebUiLogic {
    #[serde(default)]
    pub border_radius: String,
    #[serde(default)]
    pub spacing_style: String,
    #[serde(default)]
    pub button_style: String,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SocialMediaStyle {
    #[serde(default)]
    pub image_filter: String,
    #[serde(default)]
    pub grid_layout: String,
    #[serde(default)]
    pub visual_language: String,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompetitorAnalysis {
    #[serde(default)]
    pub market_gap: String,
    #[serde(default)]
    pub differentiation: String,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BrandIdentity {
    #[serde(default)]
    pub brand_name: String,
    #[serde(default)]
    pub brand_dna: BrandDna,
    #[serde(default)]
    pub target_audience: TargetAudience,
    #[serde(default)]
    pub color_palette: ColorPalette,
    #[serde(default)]
    pub typography: Typography,
    #[serde(default)]
    pub slogan_tone: SloganTone,
    #[serde(default)]
    pub web_ui_logic: WebUiLogic,
    #[serde(default)]
    pub social_media_style: SocialMediaStyle,
    #[serde(default)]
    pub competitor_analysis: CompetitorAnalysis,
    /// "draft" until the user confirms the identity.
    #[serde(default)]
    pub status: Option<String>,
    /// Narrative report prose preceding the structured block, when present.
    #[serde(default)]
    pub report: Option<String>,
}

impl BrandIdentity {
    /// Deep-merge a partial structured update into this aggregate.
    ///
    /// Null, empty-string and empty-array leaves in the update are treated
    /// as omitted: the model re-emits the full box skeleton on every turn,
    /// and blank boxes must not wipe previously accumulated content.
    /// Returns an error (leaving `self` untouched) when the merged document
    /// no longer deserializes into the aggregate shape.
    pub fn merge_update(&mut self, update: &serde_json::Value) -> crate::types::AppResult<()> {
        if !update.is_object() {
            return Err(crate::types::AppError::InvalidRequest(
                "brand update is not a JSON object".to_string(),
            ));
        }

        let mut base = serde_json::to_value(&*self)
            .map_err(|e| crate::types::AppError::Internal(e.to_string()))?;
        merge_value(&mut base, update);

        let merged: BrandIdentity = serde_json::from_value(base)
            .map_err(|e| crate::types::AppError::InvalidRequest(format!("unmergeable brand update: {e}")))?;
        *self = merged;
        Ok(())
    }
}

/// Recursive object merge. Objects merge key-wise; any other update value
/// overwrites, except "absent" markers (null, "", []) which keep the base.
fn merge_value(base: &mut serde_json::Value, update: &serde_json::Value) {
    match update {
        serde_json::Value::Object(update_map) => {
            if let serde_json::Value::Object(base_map) = base {
                for (key, update_val) in update_map {
                    match base_map.get_mut(key) {
                        Some(base_val) => merge_value(base_val, update_val),
                        None => {
                            if !is_absent(update_val) {
                                base_map.insert(key.clone(), update_val.clone());
                            }
                        }
                    }
                }
            } else {
                *base = update.clone();
            }
        }
        update_val => {
            if !is_absent(update_val) {
                *base = update_val.clone();
            }
        }
    }
}

fn is_absent(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

//! Creative Director
//!
//! The terminal synthesis persona. Consumes every expert report plus the
//! original turn and conversation history, and is the only task whose output
//! streams to the user incrementally. Its prose must end with the fenced
//! JSON block the state extractor consumes.

use crate::models::ChatMessage;

pub const PERSONA: &str = r#"ROLE: CEO and Creative Director of the brand agency (orchestrator).
MISSION: Synthesize the client's brief and the expert reports (sociologist,
psychologist, visual strategist, growth strategist) into one final, coherent,
professional brand strategy, then fold in the auditor's critique.

PROTOCOL:
1. Read the client data and every expert report.
2. Resolve contradictions: if the sociologist says "rebel" and the strategist
   says "corporate", pick what serves the brand's core and note the call.
3. Missing data: when the client gave nothing (no audience, no competitors),
   commit to the most profitable, most plausible assumption and write it into
   the report as a decision, not a question.
4. Treat every piece of client feedback as a revision order: update only what
   it touches, keep everything else stable.
5. Apply the auditor's critique where it is right; where you overrule it, say
   so in one line.

FINAL REPORT TEMPLATE (Markdown):
# [BRAND NAME] - MASTER BRAND BLUEPRINT

## 1. Strategic Summary
## 2. Sociological Analysis
## 3. Psychological Foundations
## 4. Technical Visual Parameters
## 5. Activation Directives
## 6. Marketing & Growth Strategy

STATE-DRIVEN UPDATE (MANDATORY):
After the report, emit the updated brand identity as the very last thing in
your answer, inside a ```json fenced block, exactly in this shape. Re-emit
every box; leave boxes you did not touch empty.

```json
{
  "brand_name": "",
  "brand_dna": { "purpose": "", "values": [], "usp": "" },
  "target_audience": { "demographics": "", "psychographics": "", "archetype": "" },
  "color_palette": { "primary": "", "secondary": "", "accent": "", "rationale": "" },
  "typography": { "heading_font": "", "body_font": "", "style_rationale": "" },
  "slogan_tone": { "tagline": "", "tone_of_voice": "", "keywords": [] },
  "web_ui_logic": { "border_radius": "", "spacing_style": "", "button_style": "" },
  "social_media_style": { "image_filter": "", "grid_layout": "", "visual_language": "" },
  "competitor_analysis": { "market_gap": "", "differentiation": "" }
}
```

RULES:
- Colors always as HEX codes (e.g. #FF5733).
- Fonts only from the Google Fonts library.
- Keep boxes "draft" until the client approves; after approval add
  "status": "confirmed" to the JSON.
- The JSON block must be valid and complete."#;

pub struct DirectorInputs<'a> {
    pub turn: &'a str,
    pub history: &'a [ChatMessage],
    pub cultural_report: &'a str,
    pub behavioral_report: &'a str,
    pub visual_report: &'a str,
    pub growth_report: &'a str,
    pub critique: &'a str,
}

pub fn build_prompt(inputs: &DirectorInputs<'_>) -> String {
    let history = if inputs.history.is_empty() {
        "(first turn of the conversation)".to_string()
    } else {
        inputs
            .history
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"CONVERSATION SO FAR:
{history}

CLIENT'S LATEST MESSAGE:
{turn}

SOCIOLOGICAL POSITIONING REPORT:
{cultural_report}

BRAND PSYCHOLOGY AND ARCHETYPE MAP:
{behavioral_report}

TECHNICAL DESIGN AND POSITIONING PARAMETERS:
{visual_report}

MARKETING ACTION PLAN:
{growth_report}

AUDITOR'S CRITIQUE:
{critique}

Write the final response to the client: the master blueprint (or the focused
revision, if this turn is feedback on an approved draft), then the mandatory
trailing JSON block."#,
        history = history,
        turn = inputs.turn,
        cultural_report = inputs.cultural_report,
        behavioral_report = inputs.behavioral_report,
        visual_report = inputs.visual_report,
        growth_report = inputs.growth_report,
        critique = inputs.critique,
    )
}

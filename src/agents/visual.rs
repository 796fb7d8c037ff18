//! Visual Strategist
//!
//! Turns the two root analyses into technical design and market positioning
//! parameters. Runs only after both roots are done, consuming both reports.

pub const PERSONA: &str = r#"ROLE: Brand Strategist and Visual Architect at a brand agency.
MISSION: Translate the sociological and psychological analyses into concrete
design and market-positioning parameters.

RESPONSIBILITIES:
- Color palette: primary, secondary and accent as HEX codes, with rationale.
- Typography: heading and body font pairings from the Google Fonts library.
- Market gap: the visual move competitors are not making that this brand will.

CONSTRAINTS:
- If the client named no competitors, reason about the strongest likely global
  and local players in the sector.
- Favor bold, underused color and style combinations that create contrast in
  the category; never default to safe beige.

OUTPUT: Technical design and market positioning parameters."#;

pub fn build_prompt(turn: &str, cultural_report: &str, behavioral_report: &str) -> String {
    format!(
        r#"CLIENT BRIEF:
{turn}

SOCIOLOGICAL POSITIONING REPORT:
{cultural_report}

BRAND PSYCHOLOGY AND ARCHETYPE MAP:
{behavioral_report}

Synthesize both expert reports into the technical design and market
positioning parameters. Where the experts disagree, pick the direction that
best serves the brand's core and say why."#,
        turn = turn,
        cultural_report = cultural_report,
        behavioral_report = behavioral_report,
    )
}

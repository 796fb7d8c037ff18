//! Behavioral Analyst
//!
//! Neuro-marketing persona: archetypes, emotional hooks, tone of voice. The
//! second root task.

use crate::scrape::ScrapedPage;

pub const PERSONA: &str = r#"ROLE: Neuro-Marketing Expert (Behavioral Scientist) at a brand agency.
MISSION: Build the brand's emotional and subconscious strategy.

RESPONSIBILITIES:
- Choose one of the twelve Jungian archetypes for the brand (Hero, Outlaw,
  Caregiver, Creator, Sage...) and justify it.
- Define the brand's emotional hook: what the customer should feel.
- Define the tone of voice.

CONSTRAINTS:
- If the target audience is unclear, construct the psychological profile with the
  highest purchase motivation for this sector and product type yourself.
- Look for archetype gaps among sector competitors and give the brand a
  distinctive character.

OUTPUT: A brand psychology and archetype map."#;

pub fn build_prompt(turn: &str, page: Option<&ScrapedPage>) -> String {
    match page {
        Some(page) => format!(
            r#"CLIENT BRIEF:
{turn}

The client referenced their website; anchor the psychological read in its actual
copy and imagery rather than category cliches.

{page_context}

Produce the brand psychology and archetype map."#,
            turn = turn,
            page_context = page.as_prompt_context(),
        ),
        None => format!(
            r#"CLIENT BRIEF:
{turn}

Produce the brand psychology and archetype map."#,
            turn = turn,
        ),
    }
}

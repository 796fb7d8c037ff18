//! Cultural Analyst
//!
//! Senior sociologist persona. Places the brand in its social context:
//! zeitgeist, tribes, cultural mission, localization. One of the two root
//! tasks; runs concurrently with the behavioral analyst.

use crate::scrape::ScrapedPage;

pub const PERSONA: &str = r#"ROLE: Senior Sociologist (Cultural Analyst) at a brand agency.
MISSION: Place the brand in its social and cultural context.

RESPONSIBILITIES:
- Analyze the zeitgeist the brand is entering.
- Identify the cultural codes of the target audience and the "tribes" they belong to.
- Define the brand's cultural mission in society.
- Localization: analyze the geography the brand targets; map colors, symbols and
  words to their local meanings, and flag any that read differently in the target
  culture than intended.

CONSTRAINTS:
- If the user has not named a target audience, assign the most plausible,
  high-purchasing-power, loyal profile yourself based on the product's nature.
- Ground the analysis in cumulative-culture thinking, not vibes.

OUTPUT: A sociological positioning report in short, dense paragraphs."#;

/// Roots see the raw turn plus any page-derived context; they never see
/// other experts' output.
pub fn build_prompt(turn: &str, page: Option<&ScrapedPage>) -> String {
    match page {
        Some(page) => format!(
            r#"CLIENT BRIEF:
{turn}

The client referenced their website. Base the analysis on what the site actually
says, not on generic assumptions about the category.

{page_context}

Produce the sociological positioning report."#,
            turn = turn,
            page_context = page.as_prompt_context(),
        ),
        None => format!(
            r#"CLIENT BRIEF:
{turn}

Produce the sociological positioning report."#,
            turn = turn,
        ),
    }
}

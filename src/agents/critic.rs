//! Critic
//!
//! Red-team auditor persona. Deliberately consumes only the visual
//! strategist's synthesis, not every upstream report, so the critique stays
//! focused and fast. Its output is delivered whole in a dedicated
//! CRITIC_REPORT event rather than streamed.

pub const PERSONA: &str = r#"ROLE: The Auditor - the hardest brand critic in the business (red team).
MISSION: Attack the proposed direction the way a skeptical customer or a rival
agency would, before the client ever sees it.

RESPONSIBILITIES:
- Cliche check: "a hundred brands already use this tagline" - demand more
  original where it applies.
- Risk scan: color palettes or names that sit too close to an existing brand,
  and where confusion or legal exposure could follow.
- Weak spots: audience/price mismatches, promises the product cannot keep.

OUTPUT: A blunt critique report. Close with either APPROVED or REVISION
REQUIRED and the reasons."#;

/// The critique is scoped to the second-stage synthesis on purpose.
pub fn build_prompt(visual_report: &str) -> String {
    format!(
        r#"PROPOSED DESIGN AND POSITIONING PARAMETERS:
{visual_report}

Audit this direction. Be specific about what fails and why; close with your
verdict."#,
        visual_report = visual_report,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critique_sees_only_the_visual_synthesis() {
        let prompt = build_prompt("palette: #101820 / #FEE715");
        assert!(prompt.contains("palette: #101820"));
        assert!(prompt.contains("verdict"));
    }
}

//! Prompt templates for document generation.
//!
//! Each template is a complete user prompt with an `{input_content}`
//! placeholder for the raw source text.

/// System prompt shared by all generation and revision requests.
pub const SYSTEM_PROMPT: &str = "You are a professional technical writer. \
You produce clean, well-structured Markdown documents: headings, lists, \
tables and emphasis where appropriate. You respond with the document only, \
without commentary or surrounding code fences.";

/// Name of the template used when the caller does not pick one.
pub const DEFAULT_TEMPLATE: &str = "default";

const PLACEHOLDER: &str = "{input_content}";

const DEFAULT: &str = "Organize the following content into a well-structured \
Markdown document with a clear title, section headings, and lists or tables \
where the content calls for them:\n\n{input_content}";

const TECHNICAL: &str = "Write a technical document in Markdown from the \
following material. Use numbered sections, code spans for identifiers and \
commands, and tables for parameter or option listings:\n\n{input_content}";

const REPORT: &str = "Write a formal report in Markdown from the following \
material. Start with an executive summary, follow with findings organized \
under headings, and end with conclusions and recommendations:\n\n{input_content}";

const MEETING_MINUTES: &str = "Write meeting minutes in Markdown from the \
following notes. Include sections for attendees, discussion points, \
decisions, and action items (as a table with owner and due date when \
known):\n\n{input_content}";

/// All template names, in display order.
pub fn available_templates() -> &'static [&'static str] {
    &["default", "technical", "report", "meeting-minutes"]
}

fn lookup(name: &str) -> Option<&'static str> {
    match name {
        "default" => Some(DEFAULT),
        "technical" => Some(TECHNICAL),
        "report" => Some(REPORT),
        "meeting-minutes" => Some(MEETING_MINUTES),
        _ => None,
    }
}

/// Render a template with the input content, or `None` for an unknown
/// template name.
pub fn render(name: &str, input: &str) -> Option<String> {
    lookup(name).map(|template| template.replace(PLACEHOLDER, input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_template_renders() {
        for name in available_templates() {
            let rendered = render(name, "NOTES").unwrap();
            assert!(rendered.contains("NOTES"), "{name} lost the input");
            assert!(!rendered.contains(PLACEHOLDER), "{name} kept the placeholder");
        }
    }

    #[test]
    fn test_unknown_template_is_none() {
        assert!(render("poem", "x").is_none());
    }

    #[test]
    fn test_default_template_is_listed() {
        assert!(available_templates().contains(&DEFAULT_TEMPLATE));
    }
}

//! Splits a resume into atomic, layout-neutral content blocks.
//!
//! Block order is fixed: header, summary, experience entries, education entries,
//! skills. The paginator never reorders blocks, so this order is the reading order.

use serde::{Deserialize, Serialize};

use crate::layout::paginator::PendingBlock;
use crate::models::resume::{date_range, ResumeData};

/// Typographic role of a line. Each layout maps roles to its own text styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineRole {
    Name,
    Contact,
    Title,
    Meta,
    Body,
    Bullet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub role: LineRole,
    pub text: String,
}

impl Line {
    fn new(role: LineRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Which resume section a block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Header,
    Summary,
    Experience,
    Education,
    Skills,
}

/// Unstyled block content: an optional section heading followed by lines.
///
/// Only the first block of a section carries the heading, so a heading always
/// travels with at least one entry and never ends up alone at the bottom of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockBody {
    pub kind: BlockKind,
    pub heading: Option<String>,
    pub lines: Vec<Line>,
    /// Right-aligned date text for entry blocks.
    pub dates: Option<String>,
}

/// Builds the ordered, unmeasured block list for a resume.
pub fn resume_blocks(data: &ResumeData) -> Vec<PendingBlock<BlockBody>> {
    let mut blocks = Vec::new();

    let mut header_lines = vec![Line::new(LineRole::Name, data.contact.name.trim())];
    let details = data.contact.details();
    if !details.is_empty() {
        header_lines.push(Line::new(LineRole::Contact, details.join(" | ")));
    }
    blocks.push(PendingBlock::new(
        "header",
        BlockBody {
            kind: BlockKind::Header,
            heading: None,
            lines: header_lines,
            dates: None,
        },
    ));

    if let Some(summary) = data.summary.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        blocks.push(PendingBlock::new(
            "summary",
            BlockBody {
                kind: BlockKind::Summary,
                heading: Some("Summary".to_string()),
                lines: vec![Line::new(LineRole::Body, summary)],
                dates: None,
            },
        ));
    }

    for (i, exp) in data.experience.iter().enumerate() {
        let mut lines = vec![Line::new(LineRole::Title, exp.title.trim())];
        let meta = join_present(&[Some(exp.company.as_str()), exp.location.as_deref()]);
        if !meta.is_empty() {
            lines.push(Line::new(LineRole::Meta, meta));
        }
        lines.extend(
            exp.bullets
                .iter()
                .map(|b| b.trim())
                .filter(|b| !b.is_empty())
                .map(|b| Line::new(LineRole::Bullet, b)),
        );
        blocks.push(PendingBlock::new(
            format!("experience-{i}"),
            BlockBody {
                kind: BlockKind::Experience,
                heading: (i == 0).then(|| "Experience".to_string()),
                lines,
                dates: date_range(exp.start.as_deref(), exp.end.as_deref()),
            },
        ));
    }

    for (i, edu) in data.education.iter().enumerate() {
        let mut lines = vec![Line::new(LineRole::Title, edu.degree.trim())];
        let meta = join_present(&[Some(edu.institution.as_str()), edu.location.as_deref()]);
        if !meta.is_empty() {
            lines.push(Line::new(LineRole::Meta, meta));
        }
        lines.extend(
            edu.details
                .iter()
                .map(|d| d.trim())
                .filter(|d| !d.is_empty())
                .map(|d| Line::new(LineRole::Bullet, d)),
        );
        blocks.push(PendingBlock::new(
            format!("education-{i}"),
            BlockBody {
                kind: BlockKind::Education,
                heading: (i == 0).then(|| "Education".to_string()),
                lines,
                dates: date_range(edu.start.as_deref(), edu.end.as_deref()),
            },
        ));
    }

    let skills: Vec<&str> = data
        .skills
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if !skills.is_empty() {
        blocks.push(PendingBlock::new(
            "skills",
            BlockBody {
                kind: BlockKind::Skills,
                heading: Some("Skills".to_string()),
                lines: vec![Line::new(LineRole::Body, skills.join(" · "))],
                dates: None,
            },
        ));
    }

    blocks
}

fn join_present(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::{Contact, Education, Experience};

    fn sample() -> ResumeData {
        ResumeData {
            contact: Contact {
                name: "Ada Lovelace".to_string(),
                email: Some("ada@example.com".to_string()),
                ..Default::default()
            },
            summary: Some("Analyst of engines.".to_string()),
            experience: vec![
                Experience {
                    title: "Engineer".to_string(),
                    company: "Analytical Co".to_string(),
                    start: Some("1842".to_string()),
                    end: Some("1843".to_string()),
                    bullets: vec!["Wrote the first program".to_string(), " ".to_string()],
                    ..Default::default()
                },
                Experience {
                    title: "Translator".to_string(),
                    company: "Menabrea Notes".to_string(),
                    ..Default::default()
                },
            ],
            education: vec![Education {
                degree: "Mathematics".to_string(),
                institution: "Private tutoring".to_string(),
                ..Default::default()
            }],
            skills: vec!["Calculus".to_string(), "Notation".to_string()],
        }
    }

    #[test]
    fn test_blocks_follow_semantic_order() {
        let ids: Vec<String> = resume_blocks(&sample()).into_iter().map(|b| b.id).collect();
        assert_eq!(
            ids,
            vec![
                "header",
                "summary",
                "experience-0",
                "experience-1",
                "education-0",
                "skills"
            ]
        );
    }

    #[test]
    fn test_only_first_entry_carries_section_heading() {
        let blocks = resume_blocks(&sample());
        assert_eq!(blocks[2].content.heading.as_deref(), Some("Experience"));
        assert_eq!(blocks[3].content.heading, None);
        assert_eq!(blocks[4].content.heading.as_deref(), Some("Education"));
    }

    #[test]
    fn test_blank_bullets_are_dropped() {
        let blocks = resume_blocks(&sample());
        let bullets = blocks[2]
            .content
            .lines
            .iter()
            .filter(|l| l.role == LineRole::Bullet)
            .count();
        assert_eq!(bullets, 1);
        assert_eq!(blocks[2].content.dates.as_deref(), Some("1842 – 1843"));
    }

    #[test]
    fn test_empty_optional_sections_are_omitted() {
        let data = ResumeData {
            contact: Contact {
                name: "Solo".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let blocks = resume_blocks(&data);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content.kind, BlockKind::Header);
        assert_eq!(blocks[0].content.lines.len(), 1);
    }
}

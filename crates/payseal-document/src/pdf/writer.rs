// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — render payslip runs (one page per employee) with `printpdf` 0.8.
//
// Used for sample data and test fixtures. printpdf 0.8 uses a data-oriented
// API: pages are `PdfPage` structs holding `Vec<Op>`, serialised via
// `PdfDocument::save()`.

use chrono::NaiveDate;
use payseal_core::types::Employee;
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, TextItem,
};
use tracing::{debug, info, instrument};

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const MARGIN_MM: f32 = 20.0;
const FONT_SIZE_PT: f32 = 11.0;
const LINE_HEIGHT_PT: f32 = 14.0;

/// Text content of one payslip page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayslipPage {
    pub lines: Vec<String>,
}

impl PayslipPage {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Placeholder payslip for `employee` in the month of `period`.
    pub fn for_employee(employee: &Employee, period: NaiveDate) -> Self {
        Self::new(vec![
            "Payslip".to_string(),
            String::new(),
            format!("Employee: {}", employee.display_name()),
            format!("Employee ID: {}", employee.id_number),
            format!("Period: {}", period.format("%B %Y")),
        ])
    }
}

/// Renders multi-page payslip documents on A4.
pub struct PdfWriter {
    /// Title metadata embedded in the PDF /Info dictionary.
    title: String,
}

impl PdfWriter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// One page per entry in `pages`, in order. Lines longer than the usable
    /// width are wrapped; overflow past the bottom margin is cut.
    #[instrument(skip_all, fields(pages = pages.len()))]
    pub fn create_payslips(&self, pages: &[PayslipPage]) -> Vec<u8> {
        info!(title = %self.title, "rendering payslip document");

        let margin_pt = Mm(MARGIN_MM).into_pt().0;
        let page_h_pt = PAGE_HEIGHT.into_pt().0;
        let lines_per_page = ((page_h_pt - 2.0 * margin_pt) / LINE_HEIGHT_PT) as usize;

        // Average Helvetica glyph width is roughly half the font size.
        let avg_char_width_mm = 0.50 * FONT_SIZE_PT * 0.3528;
        let max_chars = ((PAGE_WIDTH.0 - 2.0 * MARGIN_MM) / avg_char_width_mm) as usize;

        let mut doc = PdfDocument::new(&self.title);
        let mut rendered: Vec<PdfPage> = Vec::with_capacity(pages.len());

        for page in pages {
            let lines = wrap_lines(&page.lines, max_chars);
            let mut ops: Vec<Op> = Vec::new();

            for (line_idx, line) in lines.iter().take(lines_per_page).enumerate() {
                let y_pt = page_h_pt - margin_pt - (line_idx as f32 * LINE_HEIGHT_PT);
                ops.push(Op::StartTextSection);
                ops.push(Op::SetTextCursor {
                    pos: Point {
                        x: Pt(margin_pt),
                        y: Pt(y_pt),
                    },
                });
                ops.push(Op::SetFontSizeBuiltinFont {
                    size: Pt(FONT_SIZE_PT),
                    font: BuiltinFont::Helvetica,
                });
                ops.push(Op::WriteTextBuiltinFont {
                    items: vec![TextItem::Text(line.clone())],
                    font: BuiltinFont::Helvetica,
                });
                ops.push(Op::EndTextSection);
            }

            rendered.push(PdfPage::new(PAGE_WIDTH, PAGE_HEIGHT, ops));
        }

        doc.with_pages(rendered);
        debug!(pages = doc.pages.len(), "payslip layout complete");

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        doc.save(&PdfSaveOptions::default(), &mut warnings)
    }

    /// One placeholder payslip per employee, in roster order.
    pub fn create_sample_run(&self, employees: &[Employee], period: NaiveDate) -> Vec<u8> {
        let pages: Vec<PayslipPage> = employees
            .iter()
            .map(|employee| PayslipPage::for_employee(employee, period))
            .collect();
        self.create_payslips(&pages)
    }
}

/// Word-wrap each line to at most `max_width` characters; words longer than
/// that are force-broken. Empty lines are kept as spacing.
fn wrap_lines(lines: &[String], max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut result = Vec::new();

    for line in lines {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            result.push(String::new());
            continue;
        }

        let mut current = String::with_capacity(max_width);
        for word in words {
            let mut remaining = word;
            while remaining.chars().count() > max_width {
                if !current.is_empty() {
                    result.push(std::mem::take(&mut current));
                }
                let split_at = remaining
                    .char_indices()
                    .nth(max_width)
                    .map_or(remaining.len(), |(idx, _)| idx);
                let (chunk, rest) = remaining.split_at(split_at);
                result.push(chunk.to_string());
                remaining = rest;
            }
            if remaining.is_empty() {
                continue;
            }
            if current.is_empty() {
                current.push_str(remaining);
            } else if current.chars().count() + 1 + remaining.chars().count() <= max_width {
                current.push(' ');
                current.push_str(remaining);
            } else {
                result.push(std::mem::take(&mut current));
                current.push_str(remaining);
            }
        }

        if !current.is_empty() {
            result.push(current);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_long_lines_and_breaks_long_words() {
        let wrapped = wrap_lines(&["aaa bbb ccc".to_string(), "dddddddd".to_string()], 7);
        assert_eq!(wrapped, vec!["aaa bbb", "ccc", "ddddddd", "d"]);
    }

    #[test]
    fn keeps_blank_lines() {
        let wrapped = wrap_lines(&["a".to_string(), String::new(), "b".to_string()], 10);
        assert_eq!(wrapped, vec!["a", "", "b"]);
    }

    #[test]
    fn sample_run_has_one_page_per_employee() {
        let employees: Vec<Employee> = (1..=4)
            .map(|i| Employee {
                id: format!("emp-{i}"),
                name: format!("Name{i}"),
                surname: format!("Surname{i}"),
                id_number: format!("ID{i}"),
            })
            .collect();
        let period = NaiveDate::from_ymd_opt(2026, 5, 1).expect("date");
        let bytes = PdfWriter::new("Sample").create_sample_run(&employees, period);

        assert!(bytes.starts_with(b"%PDF"));
        let doc = lopdf::Document::load_mem(&bytes).expect("parse rendered PDF");
        assert_eq!(doc.get_pages().len(), 4);
    }

    #[test]
    fn payslip_page_mentions_employee() {
        let employee = Employee {
            id: "emp-1".into(),
            name: "Jane".into(),
            surname: "Smith".into(),
            id_number: "ID100001".into(),
        };
        let period = NaiveDate::from_ymd_opt(2026, 1, 1).expect("date");
        let page = PayslipPage::for_employee(&employee, period);
        assert!(page.lines.contains(&"Employee: Jane Smith".to_string()));
        assert!(page.lines.contains(&"Period: January 2026".to_string()));
    }
}

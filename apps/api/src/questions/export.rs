//! Plain-text transcript of a generated question set, for download.

use chrono::NaiveDate;

use crate::questions::parser::QuestionAnswer;

const RULE_WIDTH: usize = 80;

pub fn transcript_file_name(timestamp_millis: i64) -> String {
    format!("interview-questions-{timestamp_millis}.txt")
}

pub fn render_transcript(source_name: &str, questions: &[QuestionAnswer], date: NaiveDate) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    let mut out = String::from("INTERVIEW QUESTIONS & ANSWERS\n");
    out.push_str(&format!("{heavy}\n\n"));
    out.push_str(&format!("Generated from: {source_name}\n"));
    out.push_str(&format!("Date: {}\n", date.format("%Y-%m-%d")));
    out.push_str(&format!("Total Questions: {}\n\n", questions.len()));
    out.push_str(&format!("{heavy}\n\n"));

    for (index, qa) in questions.iter().enumerate() {
        out.push_str(&format!("QUESTION {}:\n", index + 1));
        out.push_str(&format!("{}\n\n", qa.question));
        out.push_str("ANSWER:\n");
        out.push_str(&format!("{}\n\n", qa.answer));
        out.push_str(&format!("{light}\n\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_layout() {
        let questions = vec![
            QuestionAnswer {
                question: "Why this role?".into(),
                answer: "Growth.".into(),
            },
            QuestionAnswer {
                question: "Biggest failure?".into(),
                answer: "Shipping late.\nLearned to scope.".into(),
            },
        ];
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();

        let text = render_transcript("resume.pdf", &questions, date);

        assert!(text.starts_with("INTERVIEW QUESTIONS & ANSWERS\n"));
        assert!(text.contains("Generated from: resume.pdf\n"));
        assert!(text.contains("Date: 2026-10-18\n"));
        assert!(text.contains("Total Questions: 2\n"));
        assert!(text.contains("QUESTION 2:\nBiggest failure?\n\nANSWER:\nShipping late.\nLearned to scope.\n\n"));
        assert_eq!(text.matches(&"-".repeat(80)).count(), 2);
    }

    #[test]
    fn test_empty_transcript_still_has_header() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let text = render_transcript("resume.pdf", &[], date);
        assert!(text.contains("Total Questions: 0"));
        assert!(!text.contains("QUESTION 1:"));
    }

    #[test]
    fn test_transcript_file_name() {
        assert_eq!(transcript_file_name(1700000000000), "interview-questions-1700000000000.txt");
    }
}

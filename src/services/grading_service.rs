use std::collections::{HashMap, HashSet};

use crate::dto::assessment_dto::SubmittedAnswer;
use crate::error::{Error, Result};
use crate::models::question::Question;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub selected_choice_id: Option<i64>,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradeOutcome {
    pub score: i32,
    pub total_marks: i64,
    pub answers: Vec<GradedAnswer>,
}

impl GradeOutcome {
    pub fn percentage(&self) -> f64 {
        if self.total_marks > 0 {
            f64::from(self.score) / self.total_marks as f64 * 100.0
        } else {
            0.0
        }
    }
}

pub struct GradingService;

impl GradingService {
    /// Single-choice grading. `correct` maps question id to its correct choice id.
    /// Answers to questions outside the assessment are dropped, and only the
    /// first answer per question counts. A score past `i32::MAX` is rejected
    /// since the linkage column cannot hold it.
    pub fn grade(
        questions: &[Question],
        correct: &HashMap<i64, i64>,
        submitted: &[SubmittedAnswer],
    ) -> Result<GradeOutcome> {
        let marks: HashMap<i64, i32> = questions.iter().map(|q| (q.id, q.marks)).collect();
        let total_marks: i64 = questions.iter().map(|q| i64::from(q.marks)).sum();

        let mut seen = HashSet::new();
        let mut score = 0i32;
        let mut answers = Vec::new();
        for answer in submitted {
            let Some(&question_marks) = marks.get(&answer.question_id) else {
                tracing::debug!(question_id = answer.question_id, "answer for foreign question ignored");
                continue;
            };
            if !seen.insert(answer.question_id) {
                continue;
            }
            let is_correct = match (answer.selected_choice_id, correct.get(&answer.question_id)) {
                (Some(selected), Some(&right)) => selected == right,
                _ => false,
            };
            if is_correct {
                score = score
                    .checked_add(question_marks)
                    .ok_or(Error::ScoreOverflow)?;
            }
            answers.push(GradedAnswer {
                question_id: answer.question_id,
                selected_choice_id: answer.selected_choice_id,
                is_correct,
            });
        }

        Ok(GradeOutcome {
            score,
            total_marks,
            answers,
        })
    }
}

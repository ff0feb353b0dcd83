//! The quiz session state machine for rounds 1 and 2.
//!
//! A session is pure state plus transitions parameterized on `now`; nothing
//! here touches the clock or storage, which keeps every timing rule
//! testable without waiting on real time. Persistence and the terminal
//! submission write live in `session::finalize`.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use common::catalog::QuizQuestion;
use common::scoring::{self, QuizPacing};
use common::{Language, Round};
use uuid::Uuid;

/// Why a recorded answer or advance was rejected.
#[derive(Debug, PartialEq, Eq)]
pub enum AnswerError {
    /// The session already reached its terminal transition.
    Terminal,
    /// The clock ran out; the caller should finalize instead.
    Expired,
    /// Question index outside the served set.
    QuestionOutOfRange,
    /// Option index outside the four options.
    OptionOutOfRange,
    /// Round 2 only accepts answers for the current question; the dial
    /// never rewinds.
    QuestionClosed,
    /// Advancing is a Round 2 operation.
    NotSequential,
}

/// Result of a terminal transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuizOutcome {
    pub raw: i32,
    pub penalty: i32,
    pub score: i32,
    pub total_questions: i32,
}

/// One participant's in-flight attempt at a quiz round.
pub struct QuizSession {
    pub id: Uuid,
    pub user_id: i32,
    pub round: Round,
    pub language: Language,
    /// True for admin attempts: the access gate does not force-terminate them.
    pub gate_exempt: bool,

    questions: Vec<QuizQuestion>,
    answers: BTreeMap<usize, usize>,
    pacing: QuizPacing,
    started_at: DateTime<Utc>,
    /// Absolute end of the whole session.
    deadline: DateTime<Utc>,
    /// Round 2: deadline of the current question. Expiries chain from the
    /// previous deadline; explicit advances reset from `now`.
    question_deadline: DateTime<Utc>,
    current_index: usize,
    /// Round 2: correct answers among questions already passed.
    correct_so_far: i32,
    question_count: usize,
    terminal: bool,
}

impl QuizSession {
    pub fn new(
        user_id: i32,
        round: Round,
        language: Language,
        questions: Vec<QuizQuestion>,
        pacing: QuizPacing,
        question_cap: usize,
        now: DateTime<Utc>,
        gate_exempt: bool,
    ) -> Self {
        let (question_count, deadline, question_deadline) = match pacing.per_question_secs {
            // Round 2: sequential with chained per-question deadlines.
            Some(per) => {
                let count = question_cap.min(questions.len());
                let end = now + Duration::seconds(per * count as i64);
                (count, end, now + Duration::seconds(per))
            }
            // Round 1: the whole pool on one shared clock.
            None => {
                let end = now + Duration::seconds(pacing.total_secs.unwrap_or(0));
                (questions.len(), end, end)
            }
        };

        Self {
            id: Uuid::new_v4(),
            user_id,
            round,
            language,
            gate_exempt,
            questions,
            answers: BTreeMap::new(),
            pacing,
            started_at: now,
            deadline,
            question_deadline,
            current_index: 0,
            correct_so_far: 0,
            question_count,
            terminal: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn question_count(&self) -> usize {
        self.question_count
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions[..self.question_count.min(self.questions.len())]
    }

    /// Round 2: the question currently on the dial.
    pub fn current_question(&self) -> Option<(usize, &QuizQuestion)> {
        if self.round != Round::Two || self.current_index >= self.question_count {
            return None;
        }
        self.questions
            .get(self.current_index)
            .map(|q| (self.current_index, q))
    }

    pub fn time_left_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.deadline - now).num_seconds().max(0)
    }

    /// Round 2: seconds left on the current question.
    pub fn question_time_left_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        (self.round == Round::Two).then(|| (self.question_deadline - now).num_seconds().max(0))
    }

    fn elapsed_secs(&self, now: DateTime<Utc>) -> i64 {
        let total = (self.deadline - self.started_at).num_seconds();
        (now - self.started_at).num_seconds().clamp(0, total)
    }

    /// Round 1: penalty points that would apply if the session closed now.
    pub fn penalty_points(&self, now: DateTime<Utc>) -> i32 {
        match self.round {
            Round::One => scoring::elapsed_penalty(self.elapsed_secs(now), self.pacing.grace_secs),
            _ => 0,
        }
    }

    fn score_current(&mut self) {
        if let Some(&picked) = self.answers.get(&self.current_index)
            && self
                .questions
                .get(self.current_index)
                .is_some_and(|q| picked == q.correct_answer)
        {
            self.correct_so_far += 1;
        }
    }

    /// Round 2: fast-forward past expired question deadlines, scoring each
    /// question's selected answer as it passes. The dial only moves forward.
    fn catch_up(&mut self, now: DateTime<Utc>) {
        if self.round != Round::Two || self.terminal {
            return;
        }
        let per = Duration::seconds(self.pacing.per_question_secs.unwrap_or(0));
        while self.current_index < self.question_count && now >= self.question_deadline {
            self.score_current();
            self.current_index += 1;
            self.question_deadline += per;
        }
    }

    /// Catch up to `now` and report whether the session's clock has run out
    /// (Round 1: shared deadline reached; Round 2: every question expired).
    pub fn poll(&mut self, now: DateTime<Utc>) -> bool {
        if self.terminal {
            return false;
        }
        match self.round {
            Round::One => now >= self.deadline,
            _ => {
                self.catch_up(now);
                self.current_index >= self.question_count
            }
        }
    }

    /// Record a participant's option choice.
    pub fn record_answer(
        &mut self,
        question_index: usize,
        option_index: usize,
        now: DateTime<Utc>,
    ) -> Result<(), AnswerError> {
        if self.terminal {
            return Err(AnswerError::Terminal);
        }
        if question_index >= self.question_count {
            return Err(AnswerError::QuestionOutOfRange);
        }
        let options = self
            .questions
            .get(question_index)
            .map(|q| q.options.len())
            .unwrap_or(0);
        if option_index >= options {
            return Err(AnswerError::OptionOutOfRange);
        }

        match self.round {
            Round::One => {
                if now >= self.deadline {
                    return Err(AnswerError::Expired);
                }
            }
            _ => {
                self.catch_up(now);
                if self.current_index >= self.question_count {
                    return Err(AnswerError::Expired);
                }
                if question_index != self.current_index {
                    return Err(AnswerError::QuestionClosed);
                }
            }
        }

        self.answers.insert(question_index, option_index);
        Ok(())
    }

    /// Round 2 explicit "next": score the current answer, move the dial,
    /// reset the per-question deadline from `now`. Returns `true` once the
    /// last question (or the cap) is passed.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<bool, AnswerError> {
        if self.round != Round::Two {
            return Err(AnswerError::NotSequential);
        }
        if self.terminal {
            return Err(AnswerError::Terminal);
        }
        self.catch_up(now);
        if self.current_index >= self.question_count {
            return Ok(true);
        }

        self.score_current();
        self.current_index += 1;
        if self.current_index >= self.question_count {
            return Ok(true);
        }
        let per = Duration::seconds(self.pacing.per_question_secs.unwrap_or(0));
        self.question_deadline = now + per;
        Ok(false)
    }

    /// Terminal transition: compute the outcome as of `now` and mark the
    /// session closed. The in-flight answer counts; Round 1 applies the
    /// elapsed-time penalty, Round 2 never carries one.
    pub fn close(&mut self, now: DateTime<Utc>) -> QuizOutcome {
        let (raw, penalty) = match self.round {
            Round::One => {
                let raw = self
                    .answers
                    .iter()
                    .filter(|(idx, picked)| {
                        self.questions
                            .get(**idx)
                            .is_some_and(|q| **picked == q.correct_answer)
                    })
                    .count() as i32;
                (
                    raw,
                    scoring::elapsed_penalty(self.elapsed_secs(now), self.pacing.grace_secs),
                )
            }
            _ => {
                self.catch_up(now);
                // Credit the question still on the dial without mutating
                // `correct_so_far`, so a reopened session can close again.
                let in_flight = if self.current_index < self.question_count {
                    self.answers
                        .get(&self.current_index)
                        .zip(self.questions.get(self.current_index))
                        .is_some_and(|(picked, q)| *picked == q.correct_answer)
                        as i32
                } else {
                    0
                };
                (self.correct_so_far + in_flight, 0)
            }
        };

        self.terminal = true;
        QuizOutcome {
            raw,
            penalty,
            score: scoring::final_score(raw, penalty),
            total_questions: self.question_count as i32,
        }
    }

    /// Undo the terminal flag after a failed submission write so the
    /// session stays in progress and a retry is safe.
    pub fn reopen(&mut self) {
        self.terminal = false;
    }
}

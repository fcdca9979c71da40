//! Grading prompt assembly.
//!
//! Pure string templating: the question, full marks, sanitized ideal answer,
//! sanitized reference text, and the student's answer are embedded into a
//! fixed multi-section block addressed to a grading persona. No retries, no
//! validation of the model's output.

/// One grading call's inputs, constructed per call.
#[derive(Clone, Debug)]
pub struct GradingRequest {
    /// Exam question, embedded verbatim.
    pub question: String,
    /// Full marks allocated to the question.
    pub full_marks: u32,
    /// Model answer, if available. Sanitized before templating.
    pub ideal_answer: Option<String>,
    /// The student's answer, embedded verbatim.
    pub student_answer: String,
}

impl GradingRequest {
    pub fn new(
        question: impl Into<String>,
        full_marks: u32,
        student_answer: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            full_marks,
            ideal_answer: None,
            student_answer: student_answer.into(),
        }
    }

    /// Attaches the ideal answer.
    #[must_use]
    pub fn with_ideal_answer(mut self, ideal_answer: impl Into<String>) -> Self {
        self.ideal_answer = Some(ideal_answer.into());
        self
    }
}

/// Strips quote characters and folds newlines to spaces.
///
/// Applied to the ideal-answer and reference-text fields only, so the
/// single-quoted template sections stay well-formed. The question and the
/// student's answer are never altered.
pub fn sanitize_field(text: &str) -> String {
    text.replace(['\'', '"'], "").replace('\n', " ")
}

/// Builds the grading prompt from a request and the retrieved reference text.
pub fn build_grading_prompt(request: &GradingRequest, reference_text: &str) -> String {
    let ideal = request
        .ideal_answer
        .as_deref()
        .map(sanitize_field)
        .unwrap_or_default();
    let reference = sanitize_field(reference_text);

    format!(
        "You are a teacher checking Bachelor's in Engineering exam papers. You will be given \
a question, its full marks, the ideal answer, the relevant reference text, and the answer \
given by the student. Your task is to grade the student's answer strictly, keeping in mind \
the full marks allocated for the question. Do not use your own knowledge and logic; focus \
mainly on the ideal answer to evaluate the response.\n\
\n\
Be sure to evaluate the completeness, accuracy, and clarity of the student's answer while \
being fair and consistent with the marks.\n\
\n\
QUESTION: '{question}'\n\
Full Marks: {full_marks}\n\
Ideal Answer: '{ideal}'\n\
Relevant Reference Text: '{reference}'\n\
\n\
Student's Answer: '{student_answer}'\n\
\n\
GRADE:",
        question = request.question,
        full_marks = request.full_marks,
        student_answer = request.student_answer,
    )
}

/// Joins retrieved passages into one reference-text block.
///
/// An empty passage list yields an empty block; retrieval coming up empty is
/// tolerated, not an error.
pub fn join_passages(passages: &[String]) -> String {
    passages.join(" ")
}

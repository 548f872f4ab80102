// Feedback prompt templates.

pub const FEEDBACK_SYSTEM: &str = "\
You are an expert in ATS (Applicant Tracking System) screening and resume review. \
You score resumes honestly: a weak resume gets a low score. \
You MUST answer with a single JSON object and nothing else.";

/// Shape the model is asked to return. Scores are 0-100.
pub const AI_RESPONSE_FORMAT: &str = r#"interface Feedback {
  overallScore: number; // max 100
  ATS: {
    score: number; // how well the resume would pass an ATS
    tips: { type: "good" | "improve"; tip: string }[]; // 3-4 tips
  };
  toneAndStyle: {
    score: number;
    tips: { type: "good" | "improve"; tip: string; explanation: string }[]; // 3-4 tips
  };
  content: {
    score: number;
    tips: { type: "good" | "improve"; tip: string; explanation: string }[];
  };
  structure: {
    score: number;
    tips: { type: "good" | "improve"; tip: string; explanation: string }[];
  };
  skills: {
    score: number;
    tips: { type: "good" | "improve"; tip: string; explanation: string }[];
  };
}"#;

/// Builds the analysis instructions for one job application.
pub fn prepare_instructions(job_title: &str, job_description: &str) -> String {
    format!(
        "Analyze and rate this resume and suggest how to improve it.\n\
         Be thorough. Point out mistakes and areas for improvement; \
         if there is a lot to improve, give low scores.\n\
         Take the job description into consideration when it is provided.\n\
         The job title is: {job_title}\n\
         The job description is: {job_description}\n\
         Provide the feedback using the following format:\n\
         {AI_RESPONSE_FORMAT}\n\
         Return the analysis as a JSON object, without any other text and without backticks."
    )
}

/// Prompt sent to the model: instructions followed by the resume text.
pub fn resume_prompt(instructions: &str, resume_text: &str) -> String {
    format!("{instructions}\n\nRESUME:\n{resume_text}")
}

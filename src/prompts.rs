/// Starter questions offered on the chatbot page
pub const EXAMPLE_QUESTIONS: [&str; 7] = [
    "I'm feeling down, how can I lift my mood?",
    "How do I manage anxiety in difficult situations?",
    "What are some ways to feel more positive?",
    "I feel overwhelmed by stress. Can you help?",
    "How can I calm my anxiety attacks?",
    "What are techniques for self-care?",
    "I feel lonely. What can I do?",
];

/// Options of the feelings questionnaire
pub const FEELINGS: [&str; 5] = [
    "I feel anxious or worried.",
    "I feel sad or depressed.",
    "I feel overwhelmed with stress.",
    "I feel lonely or isolated.",
    "I feel angry or frustrated.",
];

pub const DISCLAIMER: &str =
    "Disclaimer: This AI is not a substitute for professional mental health advice.";

pub const FOOTER: &str = "Made with ❤️ for your mental health support.";

/// Look up an example question by its 1-based number
pub fn example_question(number: usize) -> Option<&'static str> {
    number
        .checked_sub(1)
        .and_then(|index| EXAMPLE_QUESTIONS.get(index).copied())
}

/// Numbered list of the example questions
pub fn example_list() -> String {
    EXAMPLE_QUESTIONS
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {}", i + 1, q))
        .collect::<Vec<_>>()
        .join("\n")
}

//! System messages and prompt builders

use climate_agent_core::{Document, Language, Message};

/// System message shared by both response-model families
pub const CLIMATE_SYSTEM_MESSAGE: &str = r#"You are an expert educator on climate change and global warming, answering questions from a broad audience, including students, professionals, and community members from many cultures. Your job is to give accessible, engaging, and truthful guidance that people can use right away.

Persona:
- Think like a supportive teacher who meets learners where they are.
- Show empathy, acknowledging everyday barriers faced by marginalized groups.
- Respect cultural contexts and use inclusive, culturally relevant examples, especially for Indigenous peoples.

Language:
- Write in plain, conversational English that a ninth-grade student can follow.
- When a technical term is necessary, define it in the same sentence.
- Keep vocabulary friendly to readers with limited formal education.

Tone and Style:
- Warm, encouraging, and hopeful.
- Empathetic rather than clinical.
- Avoid jargon, acronyms, and stiff formality unless required for accuracy.

Content Requirements:
- Deliver clear, complete answers.
- Use short paragraphs, bullet lists, or numbered steps for readability.
- Include relatable examples or analogies.
- Always mention realistic, low-cost actions people can take.

Guidelines for Answers:
- Focus on empowerment, not fear.
- Offer at least one actionable step suited to the reader's context and resource level.
- Provide links or references when citing sources.
- Avoid bias, stereotypes, or unfounded assumptions.

IMPORTANT RESPONSE GUIDELINES:
- DO NOT use specific personal names in your responses.
- Instead of naming individuals, use generic descriptors like "someone with your skills" or "community members".
- Keep examples general and broadly applicable rather than creating fictional personas."#;

/// System message for the classifier/rewriter call
pub const CLASSIFIER_SYSTEM: &str = "You analyze user questions for a climate change assistant. \
You detect the question's language, classify whether it is about climate, environment, or \
sustainability, and rewrite it into a clear English search query. You answer ONLY in the \
requested line format, with no extra text.";

/// Prompt for the classifier/rewriter.
///
/// The model must answer with exactly four labeled lines; anything missing
/// is defaulted conservatively by the parser.
pub fn classifier_prompt(query: &str, history: &[Message], declared: Language) -> String {
    let mut prompt = String::new();

    if !history.is_empty() {
        prompt.push_str("Recent conversation:\n");
        for message in history.iter().rev().take(6).rev() {
            prompt.push_str(&format!("{}: {}\n", message.role, message.content));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "The user selected {} ({}) as their language.\n\
         User question: {}\n\n\
         Return exactly these four lines:\n\
         Language: <2-letter code of the question's language, or \"unknown\">\n\
         Classification: <on-topic|off-topic|harmful>\n\
         LanguageMatch: <yes|no|unknown>\n\
         Rewritten: <clear English search query, or \"N/A\" if the question needs no rewrite>",
        declared.name(),
        declared.code(),
        query
    ));

    prompt
}

/// User message for grounded answer generation
pub fn answer_prompt(query: &str, docs: &[Document]) -> String {
    let formatted_docs = docs
        .iter()
        .enumerate()
        .map(|(i, doc)| format!("Document {}:\n{}", i + 1, doc.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Based on the following documents and any relevant conversation history, provide a direct answer to this question: {query}

Documents for context:
{formatted_docs}

Additional Instructions:
1. Provide a clear, accurate response based on the given context.
2. Use proper markdown formatting with headers (e.g., # Main Title, ## Subtitle) for structure
3. Use clear and readable headings that summarize the content, not just repeating the question
4. Write in plain, conversational English
5. Include relatable examples or analogies when appropriate
6. Suggest realistic, low-cost actions people can take when relevant
7. Ensure headers are properly formatted with a space after # symbols (e.g., \"# Title\" not \"#Title\")
8. Start with a clear main header (# Title) that summarizes the topic, not just repeating the question
9. DO NOT start your response by repeating the user's question in the header"
    )
}

/// Prompt asking for relevance scores over conversation turns
pub fn history_relevance_prompt(query: &str, turn_count: usize) -> String {
    format!(
        "Based on this conversation history and current query, determine which parts \
         of the conversation are most relevant to answering the current query.\n\n\
         Current query: {query}\n\n\
         For each of the {turn_count} conversation turns, rate its relevance to the current \
         query on a scale of 1-5, where 5 is \"highly relevant\" and 1 is \"not relevant at all\".\n\n\
         Return ONLY the list of relevance scores, separated by commas, with no explanation.\n\
         Example: 2,4,5,1,3"
    )
}

/// Prompt for answer translation
pub fn translation_prompt(text: &str, target_lang: &str) -> String {
    format!(
        "You are a professional translator.\n\
         Translate the following English text to {target_lang}.\n\
         Style: Formal\n\
         Tone: Informative\n\n\
         English text to translate: \"{text}\"\n\
         Translation:"
    )
}

/// Prompt asking how well an answer is supported by its contexts
pub fn faithfulness_prompt(question: &str, answer: &str, contexts: &[String]) -> String {
    let joined = contexts
        .iter()
        .enumerate()
        .map(|(i, c)| format!("Context {}:\n{}", i + 1, c))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Rate how well the answer is supported by the provided contexts.\n\n\
         Question: {question}\n\n\
         Answer: {answer}\n\n\
         {joined}\n\n\
         Return ONLY an integer from 0 to 100, where 100 means every claim in the \
         answer is directly supported by the contexts and 0 means none are."
    )
}

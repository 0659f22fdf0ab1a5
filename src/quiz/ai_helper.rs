use chatgpt::prelude::*;
use chatgpt::types::CompletionResponse;

/// Shown instead of a fun fact when the provider call fails. The failure is
/// never fatal and never retried.
pub const FACT_FALLBACK: &str = "Sorry, I couldn't think of a fun fact right now.";
/// Shown instead of a hint when the provider call fails. The hint budget
/// already spent on the request stays spent.
pub const HINT_FALLBACK: &str = "Sorry, I couldn't come up with a hint right now.";

/// Thin gateway over the ChatGPT client. The rest of the bot only ever sees
/// an async call that resolves with a short string or fails.
pub struct QuizHelper {
    chat_gpt: ChatGPT,
}

impl QuizHelper {
    pub fn new(chat_gpt: ChatGPT) -> Self {
        Self { chat_gpt }
    }

    pub async fn generate_fun_fact(&self, country: &str, language: &str) -> Result<String> {
        log::debug!("Generating fun fact for {} ({})", country, language);
        let prompt = format!(
            "Tell me one interesting and concise fun fact about the {} language, \
            especially how it relates to the country of {}. Keep it under 200 characters.",
            language, country
        );

        let response: CompletionResponse = self.chat_gpt.send_message(&prompt).await?;
        let content = response.message().clone().content;

        log::debug!("Completion: {:?}", content);

        Ok(content)
    }

    pub async fn generate_hint(&self, country: &str, language: &str) -> Result<String> {
        log::debug!("Generating hint for {} ({})", country, language);
        // The clue must not give the answer away, so the prompt forbids both
        // the language and the country name.
        let prompt = format!(
            "Provide a very subtle, one-sentence creative clue for a trivia game about \
            the {} language, which is spoken in {}. The clue must not contain the words \
            \"{}\" or \"{}\". The clue should hint at a unique characteristic of the \
            language, its origin, or a famous piece of media in that language. \
            Keep it under 150 characters.",
            language, country, language, country
        );

        let response: CompletionResponse = self.chat_gpt.send_message(&prompt).await?;
        let content = response.message().clone().content;

        log::debug!("Completion: {:?}", content);

        Ok(content)
    }
}

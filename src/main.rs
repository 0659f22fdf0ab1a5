mod quiz;
mod store;
#[cfg(test)]
mod tests;

use std::sync::{Arc, Mutex};

use chatgpt::{client::ChatGPT, config::ChatGPTEngine};
use dotenv::dotenv;
use teloxide::{
    dispatching::dialogue::{serializer::Json, ErasedStorage, SqliteStorage, Storage},
    prelude::*,
    types::{ChatAction, KeyboardButton, KeyboardMarkup},
};

use quiz::ai_helper::{QuizHelper, FACT_FALLBACK, HINT_FALLBACK};
use quiz::catalog::{Catalog, Difficulty};
use quiz::{AdvanceOutcome, Phase, SessionState, SubmitOutcome};
use store::accounts::{self, AuthError, RegisterError};
use store::history::{self, QuizResult};
use store::FileStore;

type QuizDialogue = Dialogue<State, ErasedStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type SharedStore = Arc<Mutex<FileStore>>;

#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    ReceiveAuthChoice,
    ReceiveSignInEmail,
    ReceiveSignInPassword {
        email: String,
    },
    ReceiveSignUpEmail,
    ReceiveSignUpPassword {
        email: String,
    },
    Menu {
        email: String,
    },
    Quiz {
        email: String,
        session: SessionState,
    },
}

type DialogueStorage = std::sync::Arc<ErasedStorage<State>>;

#[tokio::main]
async fn main() {
    dotenv().expect("Failed to load .env file");
    let api_key = std::env::var("CHATGPT_API_KEY").expect("CHATGPT_API_KEY is not set");

    pretty_env_logger::init();
    log::info!("Starting language explorer bot...");

    let bot = Bot::from_env();

    log::info!("Opening dialogue storage...");
    let dialogue_storage: DialogueStorage = SqliteStorage::open("db.sqlite", Json)
        .await
        .expect("Failed to open dialogue storage")
        .erase();

    let catalog = Arc::new(Catalog::builtin());
    let kv_store: SharedStore = Arc::new(Mutex::new(FileStore::open("store.json")));

    let gpt = {
        let mut gpt = ChatGPT::new(api_key).expect("Unable to connect with ChatGPT");

        gpt.config.engine = ChatGPTEngine::Gpt35Turbo;
        gpt.config.timeout = std::time::Duration::from_secs(15);

        gpt
    };
    let quiz_helper = Arc::new(QuizHelper::new(gpt));

    let store_for_start = kv_store.clone();
    let store_for_sign_in = kv_store.clone();
    let store_for_sign_up = kv_store.clone();
    let store_for_menu = kv_store.clone();
    let store_for_quiz = kv_store.clone();

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, ErasedStorage<State>, State>()
            .branch(dptree::case![State::Start].endpoint(
                move |bot: Bot, dialogue: QuizDialogue, msg: Message| {
                    start(store_for_start.clone(), bot, dialogue, msg)
                },
            ))
            .branch(dptree::case![State::ReceiveAuthChoice].endpoint(receive_auth_choice))
            .branch(dptree::case![State::ReceiveSignInEmail].endpoint(receive_sign_in_email))
            .branch(dptree::case![State::ReceiveSignInPassword { email }].endpoint(
                move |bot: Bot, dialogue: QuizDialogue, email: String, msg: Message| {
                    receive_sign_in_password(store_for_sign_in.clone(), bot, dialogue, email, msg)
                },
            ))
            .branch(dptree::case![State::ReceiveSignUpEmail].endpoint(receive_sign_up_email))
            .branch(dptree::case![State::ReceiveSignUpPassword { email }].endpoint(
                move |bot: Bot, dialogue: QuizDialogue, email: String, msg: Message| {
                    receive_sign_up_password(store_for_sign_up.clone(), bot, dialogue, email, msg)
                },
            ))
            .branch(dptree::case![State::Menu { email }].endpoint(
                move |bot: Bot, dialogue: QuizDialogue, email: String, msg: Message| {
                    menu(
                        catalog.clone(),
                        store_for_menu.clone(),
                        bot,
                        dialogue,
                        email,
                        msg,
                    )
                },
            ))
            .branch(dptree::case![State::Quiz { email, session }].endpoint(
                move |bot: Bot,
                      dialogue: QuizDialogue,
                      (email, session): (String, SessionState),
                      msg: Message| {
                    play_quiz(
                        quiz_helper.clone(),
                        store_for_quiz.clone(),
                        bot,
                        dialogue,
                        (email, session),
                        msg,
                    )
                },
            )),
    )
    .dependencies(dptree::deps![dialogue_storage])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;
}

const GREETING_TEXT: &str = "Welcome to Language Explorer! Guess the official language of countries \
around the world. Sign in to continue your journey, or create an account.";

const SIGN_IN: &str = "Sign in";
const SIGN_UP: &str = "Sign up";
const SHOW_HISTORY: &str = "History";
const CLEAR_HISTORY: &str = "Clear history";
const LOG_OUT: &str = "Log out";
const USE_HINT: &str = "Use a hint";
const GET_FUN_FACT: &str = "Get a fun fact";
const NEXT_QUESTION: &str = "Next question";
const FINISH: &str = "Finish";

fn auth_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![
        KeyboardButton::new(SIGN_IN),
        KeyboardButton::new(SIGN_UP),
    ]])
}

fn menu_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        Difficulty::ALL
            .iter()
            .map(|d| KeyboardButton::new(d.label()))
            .collect(),
        vec![
            KeyboardButton::new(SHOW_HISTORY),
            KeyboardButton::new(CLEAR_HISTORY),
            KeyboardButton::new(LOG_OUT),
        ],
    ])
}

/// Keyboard shown once the current question is answered: the fun-fact offer
/// (only while a correct answer hasn't claimed its fact yet) and the
/// next/finish button.
fn after_answer_keyboard(session: &SessionState) -> KeyboardMarkup {
    let mut rows = Vec::new();
    if session.phase() == (Phase::Answered { correct: true }) && session.revealed_fact.is_none() {
        rows.push(vec![KeyboardButton::new(GET_FUN_FACT)]);
    }
    let advance_label = if session.is_last_question() {
        FINISH
    } else {
        NEXT_QUESTION
    };
    rows.push(vec![KeyboardButton::new(advance_label)]);
    KeyboardMarkup::new(rows)
}

/// Turns an ISO 3166-1 alpha-2 code into the country's flag emoji (regional
/// indicator pair). Falls back to an empty string for anything malformed.
fn flag_emoji(code: &str) -> String {
    code.chars()
        .take(2)
        .filter(|c| c.is_ascii_alphabetic())
        .filter_map(|c| char::from_u32(0x1F1E6 + (c.to_ascii_uppercase() as u32 - 'A' as u32)))
        .collect()
}

async fn start(store: SharedStore, bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    // A previously signed-in account stays signed in across restarts.
    let signed_in = {
        let store = store.lock().unwrap();
        accounts::current_user(&*store)
    };
    if let Some(email) = signed_in {
        send_menu(&bot, msg.chat.id, &email).await?;
        dialogue.update(State::Menu { email }).await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, GREETING_TEXT)
        .reply_markup(auth_keyboard())
        .await?;
    dialogue.update(State::ReceiveAuthChoice).await?;
    Ok(())
}

async fn receive_auth_choice(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    match msg.text() {
        Some(SIGN_IN) => {
            bot.send_message(msg.chat.id, "Enter your email address").await?;
            dialogue.update(State::ReceiveSignInEmail).await?;
        }
        Some(SIGN_UP) => {
            bot.send_message(msg.chat.id, "Enter an email address for the new account")
                .await?;
            dialogue.update(State::ReceiveSignUpEmail).await?;
        }
        _ => {
            bot.send_message(msg.chat.id, "Please choose one of the options")
                .reply_markup(auth_keyboard())
                .await?;
        }
    }
    Ok(())
}

async fn receive_sign_in_email(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    match msg.text() {
        Some(email) => {
            bot.send_message(msg.chat.id, "Enter your password").await?;
            dialogue
                .update(State::ReceiveSignInPassword {
                    email: email.to_string(),
                })
                .await?;
        }
        None => {
            bot.send_message(msg.chat.id, "Please enter your email address (as text)")
                .await?;
        }
    }
    Ok(())
}

async fn receive_sign_in_password(
    store: SharedStore,
    bot: Bot,
    dialogue: QuizDialogue,
    email: String,
    msg: Message,
) -> HandlerResult {
    let password = match msg.text() {
        Some(password) => password,
        None => {
            bot.send_message(msg.chat.id, "Please enter your password (as text)")
                .await?;
            return Ok(());
        }
    };

    let outcome = {
        let mut store = store.lock().unwrap();
        accounts::authenticate(&mut *store, &email, password)
    };
    match outcome {
        Ok(()) => {
            bot.send_message(msg.chat.id, format!("Welcome back, {}!", email))
                .await?;
            send_menu(&bot, msg.chat.id, &email).await?;
            dialogue.update(State::Menu { email }).await?;
        }
        Err(AuthError::EmptyField) => {
            bot.send_message(msg.chat.id, "Email and password cannot be empty.")
                .reply_markup(auth_keyboard())
                .await?;
            dialogue.update(State::ReceiveAuthChoice).await?;
        }
        Err(AuthError::InvalidCredentials) => {
            bot.send_message(msg.chat.id, "Invalid credentials. Please try again or sign up.")
                .reply_markup(auth_keyboard())
                .await?;
            dialogue.update(State::ReceiveAuthChoice).await?;
        }
    }
    Ok(())
}

async fn receive_sign_up_email(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    match msg.text() {
        Some(email) => {
            bot.send_message(msg.chat.id, "Pick a password").await?;
            dialogue
                .update(State::ReceiveSignUpPassword {
                    email: email.to_string(),
                })
                .await?;
        }
        None => {
            bot.send_message(msg.chat.id, "Please enter an email address (as text)")
                .await?;
        }
    }
    Ok(())
}

async fn receive_sign_up_password(
    store: SharedStore,
    bot: Bot,
    dialogue: QuizDialogue,
    email: String,
    msg: Message,
) -> HandlerResult {
    let password = match msg.text() {
        Some(password) => password,
        None => {
            bot.send_message(msg.chat.id, "Please enter a password (as text)")
                .await?;
            return Ok(());
        }
    };

    let outcome = {
        let mut store = store.lock().unwrap();
        accounts::register(&mut *store, &email, password)
    };
    match outcome {
        Ok(()) => {
            bot.send_message(
                msg.chat.id,
                format!("Account created. Welcome aboard, {}!", email),
            )
            .await?;
            send_menu(&bot, msg.chat.id, &email).await?;
            dialogue.update(State::Menu { email }).await?;
        }
        Err(RegisterError::EmptyField) => {
            bot.send_message(msg.chat.id, "Email and password cannot be empty.")
                .reply_markup(auth_keyboard())
                .await?;
            dialogue.update(State::ReceiveAuthChoice).await?;
        }
        Err(RegisterError::AlreadyExists) => {
            bot.send_message(
                msg.chat.id,
                "An account with this email already exists. Try signing in instead.",
            )
            .reply_markup(auth_keyboard())
            .await?;
            dialogue.update(State::ReceiveAuthChoice).await?;
        }
    }
    Ok(())
}

async fn send_menu(bot: &Bot, chat_id: ChatId, email: &str) -> HandlerResult {
    bot.send_message(
        chat_id,
        format!(
            "Signed in as {}. Pick a difficulty to start a quiz, or check your history.",
            email
        ),
    )
    .reply_markup(menu_keyboard())
    .await?;
    Ok(())
}

async fn menu(
    catalog: Arc<Catalog>,
    store: SharedStore,
    bot: Bot,
    dialogue: QuizDialogue,
    email: String,
    msg: Message,
) -> HandlerResult {
    let text = match msg.text() {
        Some(text) => text,
        None => {
            send_menu(&bot, msg.chat.id, &email).await?;
            return Ok(());
        }
    };

    if let Some(difficulty) = Difficulty::from_label(text) {
        let session = SessionState::build(difficulty, &catalog, &mut rand::thread_rng());
        if session.total_questions() == 0 {
            bot.send_message(msg.chat.id, "No questions are available for this difficulty.")
                .reply_markup(menu_keyboard())
                .await?;
            return Ok(());
        }

        bot.send_message(
            msg.chat.id,
            format!(
                "Starting a {} quiz: {} questions, {} hints. Good luck!",
                difficulty.label(),
                session.total_questions(),
                session.hints_remaining
            ),
        )
        .await?;
        send_question(&bot, msg.chat.id, &session).await?;
        dialogue.update(State::Quiz { email, session }).await?;
        return Ok(());
    }

    match text {
        SHOW_HISTORY => {
            let results = {
                let store = store.lock().unwrap();
                history::load(&*store, &email)
            };
            bot.send_message(msg.chat.id, format_history(&results))
                .reply_markup(menu_keyboard())
                .await?;
        }
        CLEAR_HISTORY => {
            {
                let mut store = store.lock().unwrap();
                history::clear(&mut *store, &email);
            }
            bot.send_message(msg.chat.id, "History cleared.")
                .reply_markup(menu_keyboard())
                .await?;
        }
        LOG_OUT => {
            {
                let mut store = store.lock().unwrap();
                accounts::logout(&mut *store);
            }
            bot.send_message(msg.chat.id, "Logged out. See you next time!")
                .reply_markup(auth_keyboard())
                .await?;
            dialogue.update(State::ReceiveAuthChoice).await?;
        }
        _ => {
            bot.send_message(msg.chat.id, "Please choose one of the options")
                .reply_markup(menu_keyboard())
                .await?;
        }
    }
    Ok(())
}

fn format_history(results: &[QuizResult]) -> String {
    if results.is_empty() {
        return "No games on record yet.".to_string();
    }
    let mut lines = vec!["Your latest games:".to_string()];
    for (i, result) in results.iter().enumerate() {
        lines.push(format!(
            "{}. {}/{} ({}) at {}",
            i + 1,
            result.score,
            result.total_questions,
            result.difficulty.label(),
            result.date
        ));
    }
    lines.join("\n")
}

async fn send_question(bot: &Bot, chat_id: ChatId, session: &SessionState) -> HandlerResult {
    let question = match session.current_question() {
        Some(question) => question,
        None => return Ok(()),
    };

    let options = quiz::options::answer_options(question, &session.pool, &mut rand::thread_rng());
    let mut rows: Vec<Vec<KeyboardButton>> = options
        .iter()
        .map(|option| vec![KeyboardButton::new(option.clone())])
        .collect();
    if session.hints_remaining > 0 {
        rows.push(vec![KeyboardButton::new(USE_HINT)]);
    }

    let text = format!(
        "Question {}/{}:\n{} What is the official language of {}?\n\nHints left: {}",
        session.current_index + 1,
        session.total_questions(),
        flag_emoji(&question.code),
        question.name,
        session.hints_remaining
    );

    bot.send_message(chat_id, text)
        .reply_markup(KeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

async fn play_quiz(
    ai_helper: Arc<QuizHelper>,
    store: SharedStore,
    bot: Bot,
    dialogue: QuizDialogue,
    (email, mut session): (String, SessionState),
    msg: Message,
) -> HandlerResult {
    let text = match msg.text() {
        Some(text) => text,
        None => {
            bot.send_message(msg.chat.id, "Please use the buttons").await?;
            return Ok(());
        }
    };

    match text {
        USE_HINT => {
            let question = match session.current_question().cloned() {
                Some(question) => question,
                None => return Ok(()),
            };
            match session.request_hint() {
                Some(ticket) => {
                    // Nice-to-have only; ignore the result.
                    let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;

                    let hint = ai_helper
                        .generate_hint(&question.name, &question.language)
                        .await
                        .unwrap_or_else(|err| {
                            log::warn!("Hint generation failed: {}", err);
                            HINT_FALLBACK.to_string()
                        });
                    session.resolve_hint(ticket, hint);

                    if let Some(hint) = &session.revealed_hint {
                        bot.send_message(
                            msg.chat.id,
                            format!("Hint: \"{}\"\n\nHints left: {}", hint, session.hints_remaining),
                        )
                        .await?;
                    }
                }
                None => {
                    bot.send_message(msg.chat.id, "No hint available for this question.")
                        .await?;
                }
            }
            dialogue.update(State::Quiz { email, session }).await?;
        }
        GET_FUN_FACT => {
            let question = match session.current_question().cloned() {
                Some(question) => question,
                None => return Ok(()),
            };
            match session.request_fact() {
                Some(ticket) => {
                    let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;

                    let fact = ai_helper
                        .generate_fun_fact(&question.name, &question.language)
                        .await
                        .unwrap_or_else(|err| {
                            log::warn!("Fun fact generation failed: {}", err);
                            FACT_FALLBACK.to_string()
                        });
                    session.resolve_fact(ticket, fact);

                    if let Some(fact) = session.revealed_fact.clone() {
                        bot.send_message(msg.chat.id, fact)
                            .reply_markup(after_answer_keyboard(&session))
                            .await?;
                    }
                }
                None => {
                    bot.send_message(msg.chat.id, "No fun fact available right now.")
                        .await?;
                }
            }
            dialogue.update(State::Quiz { email, session }).await?;
        }
        NEXT_QUESTION | FINISH => match session.advance() {
            AdvanceOutcome::NextQuestion => {
                send_question(&bot, msg.chat.id, &session).await?;
                dialogue.update(State::Quiz { email, session }).await?;
            }
            AdvanceOutcome::Finished => {
                let result =
                    QuizResult::new(session.score, session.total_questions(), session.difficulty);
                {
                    // Sessions played while logged out are not persisted.
                    let mut store = store.lock().unwrap();
                    if accounts::current_user(&*store).is_some() {
                        history::append(&mut *store, &email, result);
                    }
                }

                bot.send_message(
                    msg.chat.id,
                    format!(
                        "Quiz finished! You answered {} of {} questions correctly.\nWhat would you like to do next?",
                        session.score,
                        session.total_questions()
                    ),
                )
                .reply_markup(menu_keyboard())
                .await?;
                dialogue.update(State::Menu { email }).await?;
            }
            AdvanceOutcome::Ignored => {
                bot.send_message(msg.chat.id, "Please answer the question first")
                    .await?;
            }
        },
        selected => {
            let outcome = session.submit(selected);
            match outcome {
                SubmitOutcome::Correct => {
                    bot.send_message(msg.chat.id, "Correct!")
                        .reply_markup(after_answer_keyboard(&session))
                        .await?;
                }
                SubmitOutcome::Incorrect => {
                    // The question is still current here: submit never
                    // advances past it.
                    let correction = session
                        .current_question()
                        .map(|q| {
                            format!(
                                "Not quite. The official language of {} is {}.",
                                q.name, q.language
                            )
                        })
                        .unwrap_or_else(|| "Not quite.".to_string());
                    bot.send_message(msg.chat.id, correction)
                        .reply_markup(after_answer_keyboard(&session))
                        .await?;
                }
                SubmitOutcome::Ignored => {
                    bot.send_message(msg.chat.id, "Please use the buttons")
                        .await?;
                }
            }
            dialogue.update(State::Quiz { email, session }).await?;
        }
    }
    Ok(())
}

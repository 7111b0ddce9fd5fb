//! Interactive REPL over [`WalletAgent`].

use std::io::{self, Write};

use tura::agent::{Pending, WalletAgent};

/// Configuration for the chatbot.
#[derive(Debug, Clone)]
pub struct ChatBotConfig {
    /// Prompt printed before each input line.
    pub prompt: String,
    /// Whether to print the agent greeting on start.
    pub show_greeting: bool,
}

impl Default for ChatBotConfig {
    fn default() -> Self {
        Self {
            prompt: "> ".into(),
            show_greeting: true,
        }
    }
}

/// A line-oriented chat session with the wallet assistant.
#[derive(Debug)]
pub struct ChatBot {
    agent: WalletAgent,
    config: ChatBotConfig,
    turns: usize,
}

impl ChatBot {
    /// Create a new chatbot around `agent`.
    #[inline]
    #[must_use]
    pub const fn new(agent: WalletAgent, config: ChatBotConfig) -> Self {
        Self {
            agent,
            config,
            turns: 0,
        }
    }

    /// Send one message and return the reply.
    pub async fn chat(&mut self, input: &str) -> String {
        self.turns += 1;
        self.agent.handle(input).await
    }

    /// Run the interactive REPL loop until `exit`, `quit` or end of input.
    #[allow(clippy::print_stdout)]
    pub async fn run(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        println!("Tura wallet assistant (type 'exit' or Ctrl+C to quit)");
        if self.config.show_greeting {
            println!("{}", self.agent.greeting());
        }
        println!();

        loop {
            // Password replies are read like any other line; warn before echoing.
            if self.agent.pending() == Pending::Password {
                println!("(input is echoed)");
            }
            print!("{}", self.config.prompt);
            stdout.flush()?;

            let mut input = String::new();
            if stdin.read_line(&mut input)? == 0 {
                break;
            }

            let line = strip_line_ending(&input);
            let command = line.trim();
            if command.is_empty() {
                continue;
            }
            if matches!(command, "exit" | "quit") {
                break;
            }

            println!();
            println!("{}", self.chat(line).await);
            println!();
        }

        Ok(())
    }

    /// Number of messages handled so far.
    #[inline]
    #[must_use]
    pub const fn turns(&self) -> usize {
        self.turns
    }
}

/// Drop the trailing newline only; surrounding spaces may belong to a password.
fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

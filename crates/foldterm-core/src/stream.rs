//! Text chunks in, commands out.

use crate::command::Command;
use crate::decoder::Decoder;
use crate::tokenizer::Tokenizer;

/// A tokenizer and decoder pair driven by one input stream.
#[derive(Debug, Default)]
pub struct AnsiStream {
    tokenizer: Tokenizer,
    decoder: Decoder,
}

impl AnsiStream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream whose decode caches hold `capacity` entries.
    #[must_use]
    pub fn with_cache_capacity(capacity: usize) -> Self {
        Self {
            tokenizer: Tokenizer::new(),
            decoder: Decoder::with_capacity(capacity),
        }
    }

    /// Feed a chunk and return the commands it completes, in input order.
    #[must_use]
    pub fn feed(&mut self, text: &str) -> Vec<Command> {
        self.tokenizer
            .feed(text)
            .iter()
            .flat_map(|token| self.decoder.decode(token))
            .collect()
    }

    #[must_use]
    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut Decoder {
        &mut self.decoder
    }

    #[must_use]
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }
}

// Copyright (C) 2018  ParadoxSpiral
//
// This file is part of weathervane.
//
// Weathervane is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Weathervane is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Weathervane.  If not, see <http://www.gnu.org/licenses/>.

use futures::channel::mpsc;
pub use irc::proto::Message;
use irc::{client::Sender, proto::Command};
use parking_lot::RwLock;
use unicode_segmentation::UnicodeSegmentation;

use std::sync::Arc;

use crate::error::*;

// 512 minus CRLF, and the server prepends our prefix when relaying
const MAX_PRIVMSG_LEN: usize = 510 - 9;

#[macro_export]
macro_rules! reply {
    ($mctx:expr, $target:expr, $($repl:expr),+) => {
        $mctx.send($target, format!($($repl),+))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendMode {
    /// Cut the message off at the line limit
    Truncated,
    /// Send the message in as many lines as needed
    Split,
}

pub type Outgoing = (Message, SendMode);

/// The handle modules use to talk back to IRC. Cheap to clone and safe to move into worker
/// threads; messages are queued and delivered by the bot's send loop.
#[derive(Clone)]
pub struct MessageContext {
    queue: mpsc::UnboundedSender<Outgoing>,
    nick: Arc<RwLock<String>>,
}

impl MessageContext {
    pub fn new(nick: &str) -> (MessageContext, mpsc::UnboundedReceiver<Outgoing>) {
        let (queue, receiver) = mpsc::unbounded();
        (
            MessageContext {
                queue,
                nick: Arc::new(RwLock::new(nick.to_owned())),
            },
            receiver,
        )
    }

    /// The nick the bot is currently known by
    #[inline]
    pub fn nick(&self) -> String {
        self.nick.read().clone()
    }

    #[inline]
    pub(crate) fn set_nick(&self, nick: &str) {
        if *self.nick.read() != nick {
            *self.nick.write() = nick.to_owned();
        }
    }

    #[inline]
    pub fn send(&self, target: &str, content: String) {
        self.send_with(target, content, SendMode::Split)
    }

    pub fn send_with(&self, target: &str, content: String, mode: SendMode) {
        let msg = Message {
            tags: None,
            prefix: None,
            command: Command::PRIVMSG(target.to_owned(), content),
        };
        // The receiver is only dropped once the bot shuts down, nobody is left to read the reply
        let _ = self.queue.unbounded_send((msg, mode));
    }
}

/// Where to answer a command that was sent to `channel` by `nick`: a message addressed to the
/// bot itself is a private one, so it gets answered privately.
#[inline]
pub fn reply_target<'a>(channel: &'a str, nick: &'a str, bot_nick: &str) -> &'a str {
    if channel == bot_nick {
        nick
    } else {
        channel
    }
}

/// If `msg` is a PRIVMSG that starts with one of `triggers`, returns what came after it
pub fn trigger_match<'m, T>(msg: &'m Message, triggers: &[T]) -> Option<&'m str>
where
    T: AsRef<str>,
{
    if let Command::PRIVMSG(_, ref content) = msg.command {
        triggers.iter().map(|t| t.as_ref()).find_map(|t| {
            if content.starts_with(t) {
                let rest = &content[t.len()..];
                // `.weatherman` is not `.weather`
                if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                    return Some(rest.trim());
                }
            }
            None
        })
    } else {
        None
    }
}

/// Cuts `msg` into pieces of at most `limit` bytes, without splitting graphemes
fn split(msg: &str, limit: usize) -> Vec<&str> {
    let mut lines = Vec::new();
    let (mut start, mut end) = (0, 0);
    for (idx, g) in msg.grapheme_indices(true) {
        if idx + g.len() - start > limit && end > start {
            lines.push(&msg[start..end]);
            start = end;
        }
        end = idx + g.len();
    }
    if end > start {
        lines.push(&msg[start..end]);
    }
    lines
}

pub(crate) fn send(sender: &Sender, msg: &Message, mode: SendMode) -> Result<()> {
    if let Command::PRIVMSG(ref target, ref content) = msg.command {
        let limit = MAX_PRIVMSG_LEN.saturating_sub(target.len());
        let content = content.replace('\n', " ");
        let lines = split(&content, limit);
        match mode {
            SendMode::Truncated => {
                if let Some(first) = lines.first() {
                    sender.send_privmsg(target, first)?;
                }
            }
            SendMode::Split => {
                for line in lines {
                    sender.send_privmsg(target, line)?;
                }
            }
        }
    } else {
        sender.send(msg.clone())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn privmsg(target: &str, content: &str) -> Message {
        Message {
            tags: None,
            prefix: None,
            command: Command::PRIVMSG(target.to_owned(), content.to_owned()),
        }
    }

    #[test]
    fn trigger_with_arguments() {
        let msg = privmsg("#weather", ".weather  New York ");
        assert_eq!(trigger_match(&msg, &[".weather"]), Some("New York"));
    }

    #[test]
    fn trigger_without_arguments() {
        let msg = privmsg("#weather", ".weather");
        assert_eq!(trigger_match(&msg, &[".w", ".weather"]), Some(""));
    }

    #[test]
    fn trigger_needs_word_boundary() {
        let msg = privmsg("#weather", ".weatherman says hi");
        assert_eq!(trigger_match(&msg, &[".weather"]), None);
        let msg = privmsg("#weather", "what's the .weather");
        assert_eq!(trigger_match(&msg, &[".weather"]), None);
    }

    #[test]
    fn non_privmsg_never_triggers() {
        let msg = Message {
            tags: None,
            prefix: None,
            command: Command::NOTICE("#weather".to_owned(), ".weather Paris".to_owned()),
        };
        assert_eq!(trigger_match(&msg, &[".weather"]), None);
    }

    #[test]
    fn private_replies_go_to_nick() {
        assert_eq!(reply_target("#weather", "alice", "vane"), "#weather");
        assert_eq!(reply_target("vane", "alice", "vane"), "alice");
    }

    #[test]
    fn split_short_message() {
        assert_eq!(split("hello", 10), vec!["hello"]);
        assert!(split("", 10).is_empty());
    }

    #[test]
    fn split_long_message() {
        assert_eq!(split("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn split_keeps_graphemes_whole() {
        // ☀️ is 6 bytes: U+2600 plus a variation selector
        let lines = split("a☀️b", 4);
        assert_eq!(lines, vec!["a", "☀️", "b"]);
    }

    #[test]
    fn context_queues_privmsgs() {
        let (mctx, mut rx) = MessageContext::new("vane");
        reply!(mctx, "#weather", "{}: {}", "alice", "hi");

        let (msg, mode) = rx.try_next().unwrap().unwrap();
        assert_eq!(mode, SendMode::Split);
        match msg.command {
            Command::PRIVMSG(target, content) => {
                assert_eq!(target, "#weather");
                assert_eq!(content, "alice: hi");
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn context_tracks_nick() {
        let (mctx, _rx) = MessageContext::new("vane");
        let clone = mctx.clone();
        mctx.set_nick("vane_");
        assert_eq!(clone.nick(), "vane_");
    }
}

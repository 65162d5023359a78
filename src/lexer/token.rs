//! Arena-backed doubly linked token list.
//!
//! The whole compilation shares one token stream: the lexer builds it, the
//! preprocessor rewrites it in place and the parser consumes it. Cells are
//! never freed; unlinking only detaches a cell from the chain, the arena
//! lives until the end of the compilation. Links are arena indices rather
//! than references, which keeps the doubly linked structure safe to mutate.

use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenId(u32);

impl TokenId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub text: String,
    pub file: Rc<str>,
    pub line: u64,
    prev: Option<TokenId>,
    next: Option<TokenId>,
}

#[derive(Debug, Default)]
pub struct TokenList {
    cells: Vec<Token>,
    head: Option<TokenId>,
    tail: Option<TokenId>,
}

impl TokenList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn head(&self) -> Option<TokenId> {
        self.head
    }

    pub fn tail(&self) -> Option<TokenId> {
        self.tail
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn get(&self, id: TokenId) -> &Token {
        &self.cells[id.index()]
    }

    pub fn text(&self, id: TokenId) -> &str {
        &self.cells[id.index()].text
    }

    pub fn next(&self, id: TokenId) -> Option<TokenId> {
        self.cells[id.index()].next
    }

    pub fn prev(&self, id: TokenId) -> Option<TokenId> {
        self.cells[id.index()].prev
    }

    fn alloc(&mut self, text: String, file: Rc<str>, line: u64) -> TokenId {
        let id = TokenId(self.cells.len() as u32);
        self.cells.push(Token {
            text,
            file,
            line,
            prev: None,
            next: None,
        });
        id
    }

    /// Append a token at the tail.
    pub fn push_back(&mut self, text: impl Into<String>, file: Rc<str>, line: u64) -> TokenId {
        let id = self.alloc(text.into(), file, line);
        match self.tail {
            Some(tail) => {
                self.cells[tail.index()].next = Some(id);
                self.cells[id.index()].prev = Some(tail);
            }
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    /// Prepend a token at the head.
    pub fn push_front(&mut self, text: impl Into<String>, file: Rc<str>, line: u64) -> TokenId {
        let id = self.alloc(text.into(), file, line);
        match self.head {
            Some(head) => {
                self.cells[head.index()].prev = Some(id);
                self.cells[id.index()].next = Some(head);
            }
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        id
    }

    /// Insert a new token directly after `at`.
    pub fn insert_after(
        &mut self,
        at: TokenId,
        text: impl Into<String>,
        file: Rc<str>,
        line: u64,
    ) -> TokenId {
        let id = self.alloc(text.into(), file, line);
        let old_next = self.cells[at.index()].next;
        self.cells[id.index()].prev = Some(at);
        self.cells[id.index()].next = old_next;
        self.cells[at.index()].next = Some(id);
        match old_next {
            Some(next) => self.cells[next.index()].prev = Some(id),
            None => self.tail = Some(id),
        }
        id
    }

    /// Unlink `id` from the chain and return its successor. The cell stays
    /// in the arena.
    pub fn eat(&mut self, id: TokenId) -> Option<TokenId> {
        let prev = self.cells[id.index()].prev;
        let next = self.cells[id.index()].next;
        match prev {
            Some(prev) => self.cells[prev.index()].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.cells[next.index()].prev = prev,
            None => self.tail = prev,
        }
        self.cells[id.index()].prev = None;
        self.cells[id.index()].next = None;
        next
    }

    /// In-place list reversal. The lexer prepends for O(1) insertion and
    /// reverses once at the end to restore source order.
    pub fn reverse(&mut self) {
        let mut at = self.head;
        while let Some(id) = at {
            let cell = &mut self.cells[id.index()];
            std::mem::swap(&mut cell.prev, &mut cell.next);
            at = cell.prev;
        }
        std::mem::swap(&mut self.head, &mut self.tail);
    }

    /// Splice the contents of `other` into this list directly after `at`,
    /// or at the head when `at` is `None`. Consumes the other arena; its
    /// cells are re-indexed into this one.
    pub fn splice_after(&mut self, at: Option<TokenId>, other: TokenList) {
        let offset = self.cells.len() as u32;
        let shift = |id: Option<TokenId>| id.map(|t| TokenId(t.0 + offset));
        let (Some(first), Some(last)) = (shift(other.head), shift(other.tail)) else {
            return;
        };
        for mut cell in other.cells {
            cell.prev = shift(cell.prev);
            cell.next = shift(cell.next);
            self.cells.push(cell);
        }
        match at {
            Some(at) => {
                let old_next = self.cells[at.index()].next;
                self.cells[at.index()].next = Some(first);
                self.cells[first.index()].prev = Some(at);
                self.cells[last.index()].next = old_next;
                match old_next {
                    Some(next) => self.cells[next.index()].prev = Some(last),
                    None => self.tail = Some(last),
                }
            }
            None => {
                match self.head {
                    Some(head) => {
                        self.cells[last.index()].next = Some(head);
                        self.cells[head.index()].prev = Some(last);
                    }
                    None => self.tail = Some(last),
                }
                self.head = Some(first);
            }
        }
    }

    /// Iterate over the linked ids from the head.
    pub fn ids(&self) -> impl Iterator<Item = TokenId> + '_ {
        std::iter::successors(self.head, move |&id| self.next(id))
    }

    /// Collect the linked token texts; used by dump mode and tests.
    pub fn texts(&self) -> Vec<&str> {
        self.ids().map(|id| self.text(id)).collect()
    }
}

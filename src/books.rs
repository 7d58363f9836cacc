//! Book records and the in-memory catalog.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BookshelfError, Result};

/// Fields a client supplies when creating or replacing a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: Option<String>,
    pub isbn: String,
    pub published_year: i32,
}

/// A stored book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: u64,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub isbn: String,
    pub published_year: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    fn from_input(id: u64, input: BookInput, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: input.title,
            author: input.author,
            description: input.description,
            isbn: input.isbn,
            published_year: input.published_year,
            created_at,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Default)]
struct Catalog {
    books: BTreeMap<u64, Book>,
    next_id: u64,
}

/// In-memory book catalog.
///
/// Ids are handed out in increasing order and never reused.
#[derive(Default)]
pub struct BookStore {
    inner: RwLock<Catalog>,
}

impl BookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Books in id order, skipping `skip` and returning at most `limit`.
    pub fn list(&self, skip: usize, limit: usize) -> Vec<Book> {
        let catalog = self.inner.read();
        catalog
            .books
            .values()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: u64) -> Result<Book> {
        let catalog = self.inner.read();
        catalog
            .books
            .get(&id)
            .cloned()
            .ok_or(BookshelfError::NotFound(id))
    }

    pub fn create(&self, input: BookInput) -> Book {
        let mut catalog = self.inner.write();
        let id = catalog.next_id;
        catalog.next_id += 1;

        let book = Book::from_input(id, input, Utc::now());
        catalog.books.insert(id, book.clone());
        debug!(id, title = %book.title, "Book created");
        book
    }

    /// Replace a book's fields, keeping its id and creation time.
    pub fn update(&self, id: u64, input: BookInput) -> Result<Book> {
        let mut catalog = self.inner.write();
        let existing = catalog
            .books
            .get_mut(&id)
            .ok_or(BookshelfError::NotFound(id))?;

        *existing = Book::from_input(id, input, existing.created_at);
        debug!(id, "Book updated");
        Ok(existing.clone())
    }

    pub fn delete(&self, id: u64) -> Result<Book> {
        let mut catalog = self.inner.write();
        let removed = catalog
            .books
            .remove(&id)
            .ok_or(BookshelfError::NotFound(id))?;
        debug!(id, "Book deleted");
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.inner.read().books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().books.is_empty()
    }

    /// Insert the sample books the service starts with.
    pub fn seed(&self) {
        for input in sample_books() {
            self.create(input);
        }
    }
}

fn sample_books() -> Vec<BookInput> {
    vec![
        BookInput {
            title: "The Great Gatsby".to_string(),
            author: "F. Scott Fitzgerald".to_string(),
            description: Some("A story of the fabulously wealthy Jay Gatsby".to_string()),
            isbn: "978-0743273565".to_string(),
            published_year: 1925,
        },
        BookInput {
            title: "To Kill a Mockingbird".to_string(),
            author: "Harper Lee".to_string(),
            description: Some("The story of racial injustice and loss of innocence".to_string()),
            isbn: "978-0446310789".to_string(),
            published_year: 1960,
        },
    ]
}

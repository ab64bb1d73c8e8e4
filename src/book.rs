use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LibraryError, LibraryResult};

/// A normalized catalog number: 10 or 13 ASCII digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct CatalogNumber(String);

impl CatalogNumber {
    /// Accepted lengths once hyphens and whitespace are stripped
    pub const VALID_LENGTHS: [usize; 2] = [10, 13];

    /// Normalize and validate a raw catalog number
    ///
    /// Hyphens and whitespace are removed before validation, so
    /// `"978-85-7522-268-3"` and `"9788575222683"` parse to the same value.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::InvalidIdentifier` if the input is empty, holds
    /// anything other than digits and separators, or has the wrong length.
    pub fn parse(input: &str) -> LibraryResult<Self> {
        let invalid = |reason: String| LibraryError::InvalidIdentifier {
            input: input.to_string(),
            reason,
        };

        let digits: String =
            input.chars().filter(|c| *c != '-' && !c.is_whitespace()).collect();

        if digits.is_empty() {
            return Err(invalid("catalog number is empty".to_string()));
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("only digits are allowed".to_string()));
        }
        let len = digits.len();
        if !Self::VALID_LENGTHS.contains(&len) {
            return Err(invalid(format!("expected 10 or 13 digits, got {len}")));
        }

        Ok(Self(digits))
    }

    /// The normalized digit string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CatalogNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CatalogNumber {
    type Error = LibraryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CatalogNumber> for String {
    fn from(value: CatalogNumber) -> Self {
        value.0
    }
}

/// A book held by the library
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Book {
    /// Normalized catalog number
    catalog_number: CatalogNumber,
    /// Trimmed title
    title: String,
    /// Trimmed author
    author: String,
    /// False while an open loan holds the book
    available: bool,
}

impl Book {
    /// Create an available book after validating its fields
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::InvalidIdentifier` for a malformed catalog
    /// number and `LibraryError::InvalidArgument` for an empty title or author.
    pub fn register(catalog_number: &str, title: &str, author: &str) -> LibraryResult<Self> {
        let catalog_number = CatalogNumber::parse(catalog_number)?;
        let title = title.trim();
        let author = author.trim();

        if title.is_empty() {
            return Err(LibraryError::InvalidArgument("title must not be empty".to_string()));
        }
        if author.is_empty() {
            return Err(LibraryError::InvalidArgument("author must not be empty".to_string()));
        }

        Ok(Self {
            catalog_number,
            title: title.to_string(),
            author: author.to_string(),
            available: true,
        })
    }

    /// Take the book off the shelf
    ///
    /// Returns `false` without changing anything when the book is already out.
    pub fn loan(&mut self) -> bool {
        if self.available {
            self.available = false;
            true
        } else {
            false
        }
    }

    /// Put the book back on the shelf
    pub fn return_item(&mut self) {
        self.available = true;
    }

    /// Normalized catalog number
    #[must_use]
    pub fn catalog_number(&self) -> &CatalogNumber {
        &self.catalog_number
    }

    /// Trimmed title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Trimmed author
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// True while no open loan holds the book
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_register_normalizes_separators() {
        let book = Book::register("978-85-7522-268 3", "  Python Fluente ", "Luciano Ramalho")
            .expect("valid book");

        assert_eq!(book.catalog_number().as_str(), "9788575222683");
        assert_eq!(book.title(), "Python Fluente");
        assert!(book.is_available());
    }

    #[test]
    fn test_register_accepts_ten_digits() {
        assert!(Book::register("0-306-40615-2", "Title", "Author").is_ok());
    }

    #[test]
    fn test_register_rejects_short_identifier() {
        // "123" was accepted before identifiers were validated
        let result = Book::register("123", "Livro Teste", "Autor Teste");
        assert!(matches!(result, Err(LibraryError::InvalidIdentifier { .. })));
    }

    #[test]
    fn test_register_rejects_letters_and_empty() {
        assert!(matches!(
            Book::register("978853590277X", "Title", "Author"),
            Err(LibraryError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            Book::register("", "Title", "Author"),
            Err(LibraryError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            Book::register(" - ", "Title", "Author"),
            Err(LibraryError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_register_rejects_blank_title_or_author() {
        assert!(matches!(
            Book::register("9788535902772", "   ", "Robert Martin"),
            Err(LibraryError::InvalidArgument(_))
        ));
        assert!(matches!(
            Book::register("9788535902772", "Clean Code", ""),
            Err(LibraryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_loan_and_return() {
        let mut book = Book::register("9788535902772", "Clean Code", "Robert Martin")
            .expect("valid book");

        assert!(book.loan());
        assert!(!book.is_available());

        // Second loan is refused without error
        assert!(!book.loan());
        assert!(!book.is_available());

        book.return_item();
        assert!(book.is_available());
        book.return_item();
        assert!(book.is_available());
    }

    #[test]
    fn test_catalog_number_serde_uses_digits() {
        let number = CatalogNumber::parse("978-85-359-0277-2").expect("valid");
        let json = serde_json::to_string(&number).expect("serializes");
        assert_eq!(json, "\"9788535902772\"");

        let back: CatalogNumber = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(back, number);
        assert!(serde_json::from_str::<CatalogNumber>("\"12\"").is_err());
    }

    proptest! {
        #[test]
        fn prop_catalog_number_validity(input in "[0-9 \\-a-z]{0,20}") {
            let stripped: String =
                input.chars().filter(|c| *c != '-' && !c.is_whitespace()).collect();
            let expected = stripped.chars().all(|c| c.is_ascii_digit())
                && (stripped.len() == 10 || stripped.len() == 13);

            let result = Book::register(&input, "Title", "Author");
            prop_assert_eq!(result.is_ok(), expected);
            if let Ok(book) = result {
                prop_assert_eq!(book.catalog_number().as_str(), stripped.as_str());
            }
        }

        #[test]
        fn prop_digit_strings_of_valid_length_register(
            digits in prop_oneof!["[0-9]{10}", "[0-9]{13}"]
        ) {
            prop_assert!(CatalogNumber::parse(&digits).is_ok());
        }
    }
}

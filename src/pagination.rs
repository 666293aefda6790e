// Paginator for post listings

use serde::{Deserialize, Serialize};

use crate::entities::{PostFilter, PostView};
use crate::error::AppResult;
use crate::infrastructure::database::DatabaseInterface;

/// `?page=` as sent by the client; anything unparsable means page 1.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: u32,
    pub num_pages: u32,
    pub count: u64,
    pub per_page: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            object_list: self.object_list.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            per_page: self.per_page,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: u32,
}

impl Paginator {
    pub fn new(per_page: u32) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// An empty listing still has one (empty) page.
    pub fn num_pages(&self, count: u64) -> u32 {
        let pages = count.div_ceil(self.per_page as u64).max(1);
        pages.min(u32::MAX as u64) as u32
    }

    /// Out-of-range numbers clamp to the last page; garbage means page 1.
    pub fn resolve_page(&self, raw: Option<&str>, count: u64) -> u32 {
        let num_pages = self.num_pages(count);
        match raw.map(str::trim).and_then(|s| s.parse::<i64>().ok()) {
            Some(n) if n < 1 => num_pages,
            Some(n) if n > num_pages as i64 => num_pages,
            Some(n) => n as u32,
            None => 1,
        }
    }

    pub async fn paginate(
        &self,
        db: &dyn DatabaseInterface,
        filter: PostFilter,
        raw_page: Option<&str>,
    ) -> AppResult<Page<PostView>> {
        let count = db.count_posts(filter).await?;
        let number = self.resolve_page(raw_page, count);
        let num_pages = self.num_pages(count);
        let offset = (number - 1).saturating_mul(self.per_page);

        let object_list = db.list_posts(filter, self.per_page, offset).await?;

        Ok(Page {
            object_list,
            number,
            num_pages,
            count,
            per_page: self.per_page,
            has_next: number < num_pages,
            has_previous: number > 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::NewPost;
    use crate::infrastructure::sqlite_database::SqliteDatabase;

    #[test]
    fn test_page_resolution() {
        let paginator = Paginator::new(10);
        assert_eq!(paginator.num_pages(0), 1);
        assert_eq!(paginator.num_pages(10), 1);
        assert_eq!(paginator.num_pages(14), 2);

        assert_eq!(paginator.resolve_page(None, 14), 1);
        assert_eq!(paginator.resolve_page(Some("2"), 14), 2);
        assert_eq!(paginator.resolve_page(Some("abc"), 14), 1);
        assert_eq!(paginator.resolve_page(Some("99"), 14), 2);
        assert_eq!(paginator.resolve_page(Some("0"), 14), 2);
        assert_eq!(paginator.resolve_page(Some("-3"), 14), 2);
    }

    #[tokio::test]
    async fn test_fourteen_posts_split_ten_and_four() {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        let user = db.create_user("Katya").await.unwrap();
        for i in 0..14 {
            db.create_post(NewPost::new(user.id, format!("post {}", i)))
                .await
                .unwrap();
        }

        let paginator = Paginator::new(10);
        let first = paginator.paginate(&db, PostFilter::All, None).await.unwrap();
        assert_eq!(first.len(), 10);
        assert!(first.has_next);
        assert!(!first.has_previous);
        assert_eq!(first.object_list[0].text, "post 13");

        let second = paginator
            .paginate(&db, PostFilter::All, Some("2"))
            .await
            .unwrap();
        assert_eq!(second.len(), 4);
        assert_eq!(second.count, 14);
        assert!(!second.has_next);
        assert_eq!(second.object_list[3].text, "post 0");
    }

    #[tokio::test]
    async fn test_empty_listing_has_one_page() {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        let page = Paginator::new(10)
            .paginate(&db, PostFilter::All, Some("5"))
            .await
            .unwrap();
        assert!(page.is_empty());
        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
    }
}

//! In-memory implementation of `Store`.
//!
//! Documents live in `HashMap`s behind `RwLock`s; everything is lost on
//! restart. Used in tests and for local development.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use quire_core::{Manuscript, ManuscriptId, Review, ReviewId, User, UserId};

use super::{manuscript_matches, user_matches, ManuscriptFilter, Page, Store, StoreError, UserSearch};

/// In-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<UserId, User>>,
    manuscripts: RwLock<HashMap<ManuscriptId, Manuscript>>,
    reviews: RwLock<HashMap<ReviewId, Review>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_user(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.to_lowercase();
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn search_users(&self, search: &UserSearch) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().await;
        let mut matched: Vec<User> = users
            .values()
            .filter(|u| user_matches(u, search))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.name.cmp(&b.name));
        matched.truncate(search.limit);
        Ok(matched)
    }

    async fn create_manuscript(&self, manuscript: Manuscript) -> Result<(), StoreError> {
        let mut manuscripts = self.manuscripts.write().await;
        manuscripts.insert(manuscript.id.clone(), manuscript);
        Ok(())
    }

    async fn find_manuscript(&self, id: &ManuscriptId) -> Result<Option<Manuscript>, StoreError> {
        let manuscripts = self.manuscripts.read().await;
        Ok(manuscripts.get(id).cloned())
    }

    async fn find_manuscripts(
        &self,
        filter: &ManuscriptFilter,
        page: Page,
    ) -> Result<Vec<Manuscript>, StoreError> {
        let manuscripts = self.manuscripts.read().await;
        let mut matched: Vec<Manuscript> = manuscripts
            .values()
            .filter(|m| manuscript_matches(m, filter))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched.into_iter().skip(page.skip).take(page.limit).collect())
    }

    async fn count_manuscripts(&self, filter: &ManuscriptFilter) -> Result<u64, StoreError> {
        let manuscripts = self.manuscripts.read().await;
        Ok(manuscripts
            .values()
            .filter(|m| manuscript_matches(m, filter))
            .count() as u64)
    }

    async fn save_manuscript(&self, manuscript: &Manuscript) -> Result<(), StoreError> {
        let mut manuscripts = self.manuscripts.write().await;
        manuscripts.insert(manuscript.id.clone(), manuscript.clone());
        Ok(())
    }

    async fn create_review(&self, review: Review) -> Result<(), StoreError> {
        let mut reviews = self.reviews.write().await;
        reviews.insert(review.id.clone(), review);
        Ok(())
    }

    async fn find_review(
        &self,
        manuscript: &ManuscriptId,
        reviewer: &UserId,
    ) -> Result<Option<Review>, StoreError> {
        let reviews = self.reviews.read().await;
        Ok(reviews
            .values()
            .find(|r| &r.manuscript == manuscript && &r.reviewer == reviewer)
            .cloned())
    }

    async fn find_reviews_for_manuscript(
        &self,
        manuscript: &ManuscriptId,
    ) -> Result<Vec<Review>, StoreError> {
        let reviews = self.reviews.read().await;
        let mut matched: Vec<Review> = reviews
            .values()
            .filter(|r| &r.manuscript == manuscript)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(matched)
    }

    async fn save_review(&self, review: &Review) -> Result<(), StoreError> {
        let mut reviews = self.reviews.write().await;
        reviews.insert(review.id.clone(), review.clone());
        Ok(())
    }
}

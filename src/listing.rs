use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::{ImageCategory, Media, Post, PostStatus, PostType, Profile};

/// Counters shown on the researcher dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostStats {
    pub total: usize,
    pub published: usize,
    pub draft: usize,
    pub pending: usize,
    pub views: u64,
}

impl PostStats {
    pub fn of(posts: &[Post]) -> Self {
        posts.iter().fold(Self::default(), |mut stats, post| {
            stats.total += 1;
            stats.views += post.view_count;
            match post.status {
                PostStatus::Published => stats.published += 1,
                PostStatus::Draft => stats.draft += 1,
                status if status.is_pending() => stats.pending += 1,
                _ => {}
            }
            stats
        })
    }
}

/// Counters shown on the admin overview.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_posts: usize,
    pub published_posts: usize,
    pub pending_posts: usize,
    pub total_researchers: usize,
    pub total_views: u64,
}

impl DashboardStats {
    pub fn of(posts: &[Post], researchers: &[Profile]) -> Self {
        let stats = PostStats::of(posts);
        Self {
            total_posts: stats.total,
            published_posts: stats.published,
            pending_posts: stats.pending,
            total_researchers: researchers.len(),
            total_views: stats.views,
        }
    }
}

/// Query string of the publications page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicationFilter {
    pub q: String,
    pub category: String,
    #[serde(rename = "type")]
    pub post_type: String,
}

impl PublicationFilter {
    pub fn is_active(&self) -> bool {
        !(self.q.trim().is_empty() && self.category.is_empty() && self.post_type.is_empty())
    }

    /// Case-insensitive search over title and excerpt, then exact category and type.
    pub fn matches(&self, post: &Post) -> bool {
        let needle = self.q.trim().to_lowercase();
        let text_match = needle.is_empty()
            || post.title.to_lowercase().contains(&needle)
            || post
                .excerpt
                .as_deref()
                .is_some_and(|e| e.to_lowercase().contains(&needle));

        let category_match =
            self.category.is_empty() || post.category_id.as_deref() == Some(self.category.as_str());

        let type_match = self.post_type.is_empty()
            || PostType::from(self.post_type.clone()) == post.post_type;

        text_match && category_match && type_match
    }

    pub fn apply(&self, posts: Vec<Post>) -> Vec<Post> {
        posts.into_iter().filter(|p| self.matches(p)).collect()
    }
}

/// One section of the gallery page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryGroup {
    // `None` for the "Uncategorized" section.
    pub category: Option<ImageCategory>,
    pub images: Vec<Media>,
}

/// group_gallery
///
/// Sections in category order, followed by an "Uncategorized" section for
/// images with no (or an unknown) category. Empty categories are only kept
/// for administrators, who manage them from the page.
pub fn group_gallery(
    images: &[Media],
    categories: &[ImageCategory],
    include_empty: bool,
) -> Vec<GalleryGroup> {
    let mut groups: Vec<GalleryGroup> = categories
        .iter()
        .map(|category| GalleryGroup {
            category: Some(category.clone()),
            images: images
                .iter()
                .filter(|img| img.image_category_id.as_deref() == Some(category.id.as_str()))
                .cloned()
                .collect(),
        })
        .filter(|group| include_empty || !group.images.is_empty())
        .collect();

    let uncategorized: Vec<Media> = images
        .iter()
        .filter(|img| match img.image_category_id.as_deref() {
            None => true,
            Some(id) => !categories.iter().any(|c| c.id == id),
        })
        .cloned()
        .collect();

    if !uncategorized.is_empty() {
        groups.push(GalleryGroup {
            category: None,
            images: uncategorized,
        });
    }
    groups
}

/// format_date
///
/// "Jan 5, 2024" for the timestamp shapes the API produces, "N/A" when absent.
/// Unrecognised strings are shown as-is.
pub fn format_date(raw: Option<&str>, long: bool) -> String {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return "N/A".to_string();
    };

    let date = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"));

    match date {
        Ok(date) if long => date.format("%B %-d, %Y").to_string(),
        Ok(date) => date.format("%b %-d, %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(status: PostStatus, views: u64) -> Post {
        Post {
            status,
            view_count: views,
            ..Post::default()
        }
    }

    #[test]
    fn stats_count_by_status() {
        let posts = vec![
            post(PostStatus::Published, 10),
            post(PostStatus::Published, 5),
            post(PostStatus::Draft, 0),
            post(PostStatus::Submitted, 1),
            post(PostStatus::UnderReview, 0),
            post(PostStatus::Rejected, 0),
        ];
        let stats = PostStats::of(&posts);
        assert_eq!(
            stats,
            PostStats {
                total: 6,
                published: 2,
                draft: 1,
                pending: 2,
                views: 16
            }
        );

        let overview = DashboardStats::of(&posts, &[Profile::default()]);
        assert_eq!(overview.pending_posts, 2);
        assert_eq!(overview.total_researchers, 1);
    }

    #[test]
    fn publication_search_is_case_insensitive() {
        let posts = vec![
            Post {
                title: "Data Commons".into(),
                ..Post::default()
            },
            Post {
                title: "Other".into(),
                excerpt: Some("about the COMMONS".into()),
                ..Post::default()
            },
            Post {
                title: "Unrelated".into(),
                ..Post::default()
            },
        ];
        let filter = PublicationFilter {
            q: "commons".into(),
            ..PublicationFilter::default()
        };
        assert_eq!(filter.apply(posts).len(), 2);
    }

    #[test]
    fn publication_filters_combine() {
        let posts = vec![
            Post {
                category_id: Some("c1".into()),
                post_type: PostType::Opinion,
                ..Post::default()
            },
            Post {
                category_id: Some("c1".into()),
                post_type: PostType::Research,
                ..Post::default()
            },
        ];
        let filter = PublicationFilter {
            category: "c1".into(),
            post_type: "opinion".into(),
            ..PublicationFilter::default()
        };
        let matched = filter.apply(posts);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].post_type, PostType::Opinion);
    }

    #[test]
    fn gallery_groups_by_category() {
        let categories = vec![
            ImageCategory {
                id: "c1".into(),
                name: "Workshops".into(),
                description: None,
            },
            ImageCategory {
                id: "c2".into(),
                name: "Empty".into(),
                description: None,
            },
        ];
        let images = vec![
            Media {
                id: "1".into(),
                image_category_id: Some("c1".into()),
                ..Media::default()
            },
            Media {
                id: "2".into(),
                ..Media::default()
            },
            Media {
                id: "3".into(),
                image_category_id: Some("deleted".into()),
                ..Media::default()
            },
        ];

        let public = group_gallery(&images, &categories, false);
        assert_eq!(public.len(), 2);
        assert_eq!(public[0].images.len(), 1);
        assert!(public[1].category.is_none());
        assert_eq!(public[1].images.len(), 2);

        let admin = group_gallery(&images, &categories, true);
        assert_eq!(admin.len(), 3);
    }

    #[test]
    fn dates_render_like_the_site() {
        assert_eq!(format_date(None, false), "N/A");
        assert_eq!(format_date(Some("2024-01-05T10:00:00Z"), false), "Jan 5, 2024");
        assert_eq!(format_date(Some("2024-01-05 10:00:00"), true), "January 5, 2024");
        assert_eq!(format_date(Some("2024-03-09"), false), "Mar 9, 2024");
        assert_eq!(format_date(Some("yesterday"), false), "yesterday");
    }
}

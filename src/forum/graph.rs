//! Read-only queries over a topic's reply structure.
//!
//! These are pure filters over the scraped post list, evaluated per call in
//! original scrape order. Topic membership is decided by the URL-derived
//! topic id, and post identity by the full `topic-id/post-number` pair, so
//! two posts with identical content never alias each other.

use super::post::Post;

/// Normalized view of a scraped post list exposing reply-graph queries.
#[derive(Clone, Copy, Debug)]
pub struct PostGraph<'a> {
    posts: &'a [Post],
}

impl<'a> PostGraph<'a> {
    pub fn new(posts: &'a [Post]) -> Self {
        Self { posts }
    }

    /// All posts in scrape order.
    pub fn posts(&self) -> &'a [Post] {
        self.posts
    }

    /// Posts in the same topic whose reply-to-post-number equals `parent`'s
    /// position, excluding `parent` itself, in scrape order.
    pub fn direct_replies(&self, parent: &Post) -> Vec<&'a Post> {
        let parent_id = parent.source_id();
        self.posts
            .iter()
            .filter(|post| {
                post.source_id() != parent_id
                    && post.topic_id() == parent.topic_id()
                    && post.reply_to_post_number == Some(parent.post_number)
            })
            .collect()
    }

    /// The post flagged as the accepted answer in `topic_starter`'s topic.
    pub fn accepted_answer(&self, topic_starter: &Post) -> Option<&'a Post> {
        self.posts
            .iter()
            .find(|post| post.accepted_answer && post.topic_id() == topic_starter.topic_id())
    }

    /// Every post in the starter's topic besides the starter, in scrape order.
    pub fn topic_level_replies(&self, topic_starter: &Post) -> Vec<&'a Post> {
        let starter_id = topic_starter.source_id();
        self.posts
            .iter()
            .filter(|post| {
                post.source_id() != starter_id && post.topic_id() == topic_starter.topic_id()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(topic: u32, number: u32, reply_to: Option<u32>, accepted: bool) -> Post {
        Post {
            post_url: format!("https://forum.example.com/t/topic-{topic}/{topic}/{number}"),
            topic_title: format!("topic {topic}"),
            markdown: format!("post {topic}/{number}"),
            user_title: None,
            post_number: number,
            reply_count: 0,
            reply_to_post_number: reply_to,
            accepted_answer: accepted,
            image_urls: vec![],
        }
    }

    #[test]
    fn direct_replies_match_parent_position_within_topic() {
        let posts = vec![
            post(10, 1, None, false),
            post(10, 2, Some(1), false),
            post(10, 3, Some(2), false),
            post(10, 4, Some(2), false),
            // Same position in a different topic must not match.
            post(11, 3, Some(2), false),
        ];
        let graph = PostGraph::new(&posts);
        let replies = graph.direct_replies(&posts[1]);
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].source_id(), "10/3");
        assert_eq!(replies[1].source_id(), "10/4");
    }

    #[test]
    fn accepted_answer_is_topic_scoped() {
        let posts = vec![
            post(10, 1, None, false),
            post(10, 2, Some(1), true),
            post(11, 1, None, false),
        ];
        let graph = PostGraph::new(&posts);
        assert_eq!(
            graph.accepted_answer(&posts[0]).map(Post::source_id),
            Some("10/2".to_string())
        );
        assert!(graph.accepted_answer(&posts[2]).is_none());
    }

    #[test]
    fn topic_level_replies_exclude_the_starter_only() {
        let posts = vec![
            post(10, 1, None, false),
            post(10, 2, Some(1), false),
            post(10, 3, Some(2), false),
            post(11, 1, None, false),
        ];
        let graph = PostGraph::new(&posts);
        let replies = graph.topic_level_replies(&posts[0]);
        assert_eq!(replies.len(), 2);
        assert!(replies.iter().all(|reply| reply.topic_id() == "10"));
    }
}

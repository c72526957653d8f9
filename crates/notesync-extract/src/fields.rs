//! Per-field resolver tables, highest priority first.
//!
//! Order within a table: embedded state, then the hover card (author
//! fields only), then page selectors, then the class-name scan (counts only).

use notesync_core::NoteField;

use crate::resolver::{css, Source};
use crate::resolver::Source::{
    Attr, ClassScan, Global, HoverAttr, HoverCard, JsonLd, Meta, Note, Selector, TimeElement,
};

pub const TITLE: &[Source] = &[
    Note("title"),
    css("#detail-title"),
    css(r#"[data-testid="note-title"]"#),
    css(".note-detail-title"),
    css("h1"),
];

pub const AUTHOR: &[Source] = &[
    Note("author"),
    Note("authorName"),
    Note("user.name"),
    Note("user.nickname"),
    Note("userInfo.name"),
    Note("userInfo.nickname"),
    Note("user.nickName"),
    HoverCard(".name"),
    HoverCard(".nickname"),
    HoverCard(".username"),
    css(".hover-card .name"),
    css(".user-hover-card .name"),
    css(".author-hover .name"),
    css(".popup-card .name"),
    css(".tooltip .name"),
    css(".user-card .name"),
    css(".author-card .name"),
    css(".author-container .name"),
    css(".user-info .name"),
    css(".note-detail-author .name"),
    css(".author-wrapper .name"),
    css(".user-name"),
    css(r#"[data-testid="author-name"]"#),
    css(".author-info .name"),
    css(".username"),
    css(".author-name"),
    css(".user-nickname"),
    css(".nickname"),
];

const HREF: &[&str] = &["href"];

pub const AUTHOR_URL: &[Source] = &[
    Note("authorLink"),
    Note("user.link"),
    Note("user.url"),
    Note("userInfo.link"),
    Note("userInfo.url"),
    HoverAttr { css: "a[href]", attrs: HREF },
    Attr { css: ".author-container a", attrs: HREF },
    Attr { css: ".user-info a", attrs: HREF },
    Attr { css: ".note-detail-author a", attrs: HREF },
    Attr { css: ".author-wrapper a", attrs: HREF },
    Attr { css: ".user-name a", attrs: HREF },
    Attr { css: ".author-info a", attrs: HREF },
    Attr { css: r#"[data-testid="author-link"]"#, attrs: HREF },
    Attr { css: ".author-name a", attrs: HREF },
    Attr { css: ".user-nickname a", attrs: HREF },
    Attr { css: ".nickname a", attrs: HREF },
];

const BIO_ATTRS: &[&str] = &["data-bio", "data-description", "title"];

pub const AUTHOR_BIO: &[Source] = &[
    Note("authorBio"),
    Note("bio"),
    Note("user.bio"),
    Note("user.description"),
    Note("user.intro"),
    Note("user.signature"),
    Note("userInfo.bio"),
    Note("userInfo.description"),
    Note("userInfo.intro"),
    Note("userInfo.signature"),
    Note("author.bio"),
    Note("author.description"),
    Note("author.intro"),
    Note("author.signature"),
    Note("noteInfo.authorBio"),
    Note("noteDetail.authorBio"),
    Note("profile.bio"),
    Note("profile.description"),
    Note("profile.intro"),
    Note("profile.signature"),
    Note("data.user.bio"),
    Note("data.user.description"),
    Note("data.author.bio"),
    Note("data.author.description"),
    Note("meta.author.bio"),
    Note("meta.author.description"),
    Global("__INITIAL_STATE__.user.bio"),
    Global("__INITIAL_STATE__.user.description"),
    Global("__INITIAL_STATE__.author.bio"),
    Global("__INITIAL_STATE__.author.description"),
    Global("__NUXT__.data.0.user.bio"),
    Global("__NUXT__.data.0.user.description"),
    Global("initialData.user.bio"),
    Global("pageData.user.bio"),
    Global("userData.bio"),
    Global("appData.user.bio"),
    HoverCard(".desc"),
    HoverCard(".description"),
    Selector { css: ".author-container .desc", attrs: BIO_ATTRS },
    Selector { css: ".user-info .desc", attrs: BIO_ATTRS },
    Selector { css: ".note-detail-author .desc", attrs: BIO_ATTRS },
    Selector { css: ".author-wrapper .desc", attrs: BIO_ATTRS },
    Selector { css: ".user-desc", attrs: BIO_ATTRS },
    Selector { css: ".author-bio", attrs: BIO_ATTRS },
    Selector { css: r#"[data-testid="author-bio"]"#, attrs: BIO_ATTRS },
    Selector { css: ".user-description", attrs: BIO_ATTRS },
    Selector { css: ".author-description", attrs: BIO_ATTRS },
    Selector { css: ".profile-desc", attrs: BIO_ATTRS },
    Selector { css: ".user-intro", attrs: BIO_ATTRS },
    Selector { css: ".author-intro", attrs: BIO_ATTRS },
    Selector { css: "[data-bio]", attrs: BIO_ATTRS },
];

pub const AUTHOR_XHS_ID: &[Source] = &[
    Note("redId"),
    Note("user.redId"),
    Note("userInfo.redId"),
    Note("author.redId"),
    Global("__INITIAL_STATE__.user.userPageData.basicInfo.redId"),
    HoverCard(".red-id"),
    HoverCard(".user-redId"),
    css(".user-redId"),
    css(".red-id"),
    css(r#"[data-testid="red-id"]"#),
];

pub const LIKES: &[Source] = &[
    Note("likeCount"),
    Note("interactInfo.likeCount"),
    Note("interactInfo.likedCount"),
    Note("stats.likeCount"),
    Note("engagement.likes"),
    Note("metrics.like"),
    Note("noteInfo.likeCount"),
    Note("noteDetail.likeCount"),
    Note("note.likeCount"),
    Note("data.likeCount"),
    Note("interact.likeCount"),
    Note("socialData.likes"),
    Note("reactions.like"),
    Note("counts.like"),
    Note("activity.likes"),
    Note("meta.likes"),
    Global("__INITIAL_STATE__.note.likeCount"),
    Global("__NUXT__.data.0.likeCount"),
    Global("initialData.note.likeCount"),
    Global("pageData.note.likeCount"),
    Global("noteData.likeCount"),
    Global("appData.note.likeCount"),
    css(".like-wrapper .count"),
    css(".like-btn .count"),
    css(r#"[class*="like"] .count"#),
    css(".engagement-bar .like .count"),
    css(".interact-bar .like .count"),
    css(".note-detail-interaction .like .count"),
    css(".like-count"),
    css(r#"[data-testid="like-count"]"#),
    css(r#".interaction-item[data-type="like"] .count"#),
    css(".interaction-like .count"),
    css(".like-button .count"),
    css(".like-num"),
    css(".like-number"),
    Selector { css: "[data-like-count]", attrs: &["data-like-count"] },
    css(".social-actions .like .count"),
    css(".action-like .count"),
    css(".btn-like .count"),
    css(".icon-like + .count"),
    css(".thumbs-up .count"),
    css(".heart-count"),
    css(".praise-count"),
    ClassScan(&["like"]),
];

pub const COMMENTS: &[Source] = &[
    Note("commentCount"),
    Note("interactInfo.commentCount"),
    Note("stats.commentCount"),
    Note("engagement.comments"),
    Note("metrics.comment"),
    Note("noteInfo.commentCount"),
    Note("noteDetail.commentCount"),
    Note("note.commentCount"),
    Note("data.commentCount"),
    Note("interact.commentCount"),
    Note("socialData.comments"),
    Note("reactions.comment"),
    Note("counts.comment"),
    Note("activity.comments"),
    Note("meta.comments"),
    Global("__INITIAL_STATE__.note.commentCount"),
    Global("__NUXT__.data.0.commentCount"),
    Global("initialData.note.commentCount"),
    Global("pageData.note.commentCount"),
    Global("noteData.commentCount"),
    Global("appData.note.commentCount"),
    css(".comment-wrapper .count"),
    css(".comment-btn .count"),
    css(r#"[class*="comment"] .count"#),
    css(".engagement-bar .comment .count"),
    css(".interact-bar .comment .count"),
    css(".note-detail-interaction .comment .count"),
    css(".comment-count"),
    css(r#"[data-testid="comment-count"]"#),
    css(r#".interaction-item[data-type="comment"] .count"#),
    css(".interaction-comment .count"),
    css(".comment-button .count"),
    css(".comment-num"),
    css(".comment-number"),
    Selector { css: "[data-comment-count]", attrs: &["data-comment-count"] },
    css(".social-actions .comment .count"),
    css(".action-comment .count"),
    css(".btn-comment .count"),
    css(".icon-comment + .count"),
    css(".message-count"),
    css(".reply-count"),
    css(".discuss-count"),
    ClassScan(&["comment"]),
];

pub const SHARES: &[Source] = &[
    Note("shareCount"),
    Note("interactInfo.shareCount"),
    Note("stats.shareCount"),
    Note("engagement.shares"),
    Note("metrics.share"),
    Note("noteInfo.shareCount"),
    Note("noteDetail.shareCount"),
    Note("note.shareCount"),
    Note("data.shareCount"),
    Note("interact.shareCount"),
    Note("socialData.shares"),
    Note("reactions.share"),
    Note("counts.share"),
    Note("activity.shares"),
    Note("meta.shares"),
    Global("__INITIAL_STATE__.note.shareCount"),
    Global("__NUXT__.data.0.shareCount"),
    Global("initialData.note.shareCount"),
    Global("pageData.note.shareCount"),
    Global("noteData.shareCount"),
    Global("appData.note.shareCount"),
    css(".share-wrapper .count"),
    css(".share-btn .count"),
    css(r#"[class*="share"] .count"#),
    css(".engagement-bar .share .count"),
    css(".interact-bar .share .count"),
    css(".note-detail-interaction .share .count"),
    css(".share-count"),
    css(r#"[data-testid="share-count"]"#),
    css(r#".interaction-item[data-type="share"] .count"#),
    css(".interaction-share .count"),
    css(".share-button .count"),
    css(".share-num"),
    css(".share-number"),
    Selector { css: "[data-share-count]", attrs: &["data-share-count"] },
    css(".social-actions .share .count"),
    css(".action-share .count"),
    css(".btn-share .count"),
    css(".icon-share + .count"),
    css(".forward-count"),
    css(".repost-count"),
    css(".spread-count"),
    ClassScan(&["share"]),
];

pub const COLLECTIONS: &[Source] = &[
    Note("collectCount"),
    Note("interactInfo.collectCount"),
    Note("interactInfo.collectedCount"),
    Note("stats.collectCount"),
    Note("engagement.collects"),
    Note("metrics.collect"),
    css(".collect-wrapper .count"),
    css(".collect-btn .count"),
    css(r#"[class*="collect"] .count"#),
    css(".engagement-bar .collect .count"),
    css(".interact-bar .collect .count"),
    css(".note-detail-interaction .collect .count"),
    css(".collect-count"),
    css(r#"[data-testid="collect-count"]"#),
    css(".bookmark-count"),
    css(r#".interaction-item[data-type="collect"] .count"#),
    css(".interaction-collect .count"),
    css(".collect-button .count"),
    css(".collect-num"),
    css(".collect-number"),
    Selector { css: "[data-collect-count]", attrs: &["data-collect-count"] },
    css(".social-actions .collect .count"),
    css(".action-collect .count"),
    css(".btn-collect .count"),
    css(".icon-collect + .count"),
    css(".save-count"),
    css(".favorite-count"),
    ClassScan(&["collect", "bookmark", "save"]),
];

const FOLLOWER_ATTRS: &[&str] = &["data-followers", "data-fans", "data-follower-count", "title"];

pub const FOLLOWER_COUNT: &[Source] = &[
    Note("followerCount"),
    Note("fansCount"),
    Note("fans"),
    Note("followers"),
    Note("user.followerCount"),
    Note("user.fansCount"),
    Note("user.fans"),
    Note("user.followers"),
    Note("userInfo.followerCount"),
    Note("userInfo.fansCount"),
    Note("userInfo.fans"),
    Note("userInfo.followers"),
    Note("author.followerCount"),
    Note("author.fansCount"),
    Note("author.fans"),
    Note("author.followers"),
    Note("stats.followerCount"),
    Note("stats.fansCount"),
    Note("profile.followerCount"),
    Note("profile.fansCount"),
    Note("profile.fans"),
    Note("profile.followers"),
    Note("data.followerCount"),
    Note("data.fansCount"),
    Note("noteInfo.author.followerCount"),
    Note("noteDetail.author.followerCount"),
    Note("note.author.followerCount"),
    Global("__INITIAL_STATE__.user.followerCount"),
    Global("__NUXT__.data.0.author.followerCount"),
    Global("initialData.user.followerCount"),
    Global("pageData.user.followerCount"),
    Global("userData.followerCount"),
    Global("appData.user.followerCount"),
    HoverCard(".follower-count"),
    HoverCard(".fans-count"),
    HoverCard(".fans"),
    HoverCard(".followers"),
    Selector { css: ".hover-card .follower-count", attrs: FOLLOWER_ATTRS },
    Selector { css: ".user-card .follower-count", attrs: FOLLOWER_ATTRS },
    Selector { css: ".author-card .follower-count", attrs: FOLLOWER_ATTRS },
    Selector { css: ".hover-card .fans-count", attrs: FOLLOWER_ATTRS },
    Selector { css: ".user-card .fans-count", attrs: FOLLOWER_ATTRS },
    Selector { css: ".author-card .fans-count", attrs: FOLLOWER_ATTRS },
    Selector { css: ".author-container .follower-count", attrs: FOLLOWER_ATTRS },
    Selector { css: ".user-info .follower-count", attrs: FOLLOWER_ATTRS },
    Selector { css: ".note-detail-author .follower-count", attrs: FOLLOWER_ATTRS },
    Selector { css: ".author-wrapper .follower-count", attrs: FOLLOWER_ATTRS },
    Selector { css: ".author-stats .follower", attrs: FOLLOWER_ATTRS },
    Selector { css: ".user-stats .follower", attrs: FOLLOWER_ATTRS },
    Selector { css: ".follower-count", attrs: FOLLOWER_ATTRS },
    Selector { css: r#"[data-testid="follower-count"]"#, attrs: FOLLOWER_ATTRS },
    Selector { css: ".fans-count", attrs: FOLLOWER_ATTRS },
    Selector { css: ".fans", attrs: FOLLOWER_ATTRS },
    Selector { css: ".followers", attrs: FOLLOWER_ATTRS },
    Selector { css: ".author-followers", attrs: FOLLOWER_ATTRS },
    Selector { css: ".user-followers", attrs: FOLLOWER_ATTRS },
    Selector { css: "[data-followers]", attrs: FOLLOWER_ATTRS },
    Selector { css: "[data-fans]", attrs: FOLLOWER_ATTRS },
    Selector { css: "[data-follower-count]", attrs: FOLLOWER_ATTRS },
    ClassScan(&["follower", "fans"]),
];

const TOTAL_LIKES_ATTRS: &[&str] = &[
    "data-total-likes",
    "data-total-engagement",
    "data-likes-collections",
    "title",
];

pub const LIKES_AND_COLLECTIONS: &[Source] = &[
    Note("likesAndCollections"),
    Note("totalLikes"),
    Note("totalEngagement"),
    Note("user.likesAndCollections"),
    Note("user.totalLikes"),
    Note("user.totalEngagement"),
    Note("userInfo.likesAndCollections"),
    Note("userInfo.totalLikes"),
    Note("userInfo.totalEngagement"),
    Note("author.likesAndCollections"),
    Note("author.totalLikes"),
    Note("author.totalEngagement"),
    Note("stats.totalLikes"),
    Note("stats.totalEngagement"),
    Note("profile.likesAndCollections"),
    Note("profile.totalLikes"),
    Note("profile.totalEngagement"),
    Note("data.likesAndCollections"),
    Note("data.totalLikes"),
    Note("noteInfo.author.likesAndCollections"),
    Note("noteDetail.author.likesAndCollections"),
    Note("note.author.likesAndCollections"),
    Note("engagement.total"),
    Note("metrics.totalLikes"),
    Note("activity.totalLikes"),
    Global("__INITIAL_STATE__.user.likesAndCollections"),
    Global("__NUXT__.data.0.author.likesAndCollections"),
    Global("initialData.user.likesAndCollections"),
    Global("pageData.user.likesAndCollections"),
    Global("userData.likesAndCollections"),
    Global("appData.user.likesAndCollections"),
    HoverCard(".total-likes"),
    HoverCard(".total-engagement"),
    HoverCard(".likes-and-collections"),
    Selector { css: ".hover-card .total-likes", attrs: TOTAL_LIKES_ATTRS },
    Selector { css: ".user-card .total-likes", attrs: TOTAL_LIKES_ATTRS },
    Selector { css: ".author-card .total-likes", attrs: TOTAL_LIKES_ATTRS },
    Selector { css: ".author-container .total-likes", attrs: TOTAL_LIKES_ATTRS },
    Selector { css: ".user-info .total-likes", attrs: TOTAL_LIKES_ATTRS },
    Selector { css: ".note-detail-author .total-likes", attrs: TOTAL_LIKES_ATTRS },
    Selector { css: ".author-wrapper .total-likes", attrs: TOTAL_LIKES_ATTRS },
    Selector { css: ".author-stats .total-engagement", attrs: TOTAL_LIKES_ATTRS },
    Selector { css: ".user-stats .total-engagement", attrs: TOTAL_LIKES_ATTRS },
    Selector { css: ".total-likes", attrs: TOTAL_LIKES_ATTRS },
    Selector { css: r#"[data-testid="total-engagement"]"#, attrs: TOTAL_LIKES_ATTRS },
    Selector { css: ".total-engagement", attrs: TOTAL_LIKES_ATTRS },
    Selector { css: ".author-total-likes", attrs: TOTAL_LIKES_ATTRS },
    Selector { css: ".user-total-likes", attrs: TOTAL_LIKES_ATTRS },
    Selector { css: ".likes-and-collections", attrs: TOTAL_LIKES_ATTRS },
    Selector { css: ".total-interactions", attrs: TOTAL_LIKES_ATTRS },
    Selector { css: "[data-total-likes]", attrs: TOTAL_LIKES_ATTRS },
    Selector { css: "[data-total-engagement]", attrs: TOTAL_LIKES_ATTRS },
    Selector { css: "[data-likes-collections]", attrs: TOTAL_LIKES_ATTRS },
];

pub const PUBLISH_TIME: &[Source] = &[
    Note("publishTime"),
    Note("createTime"),
    Note("time"),
    Note("timestamp"),
    Note("createdAt"),
    Note("publishedAt"),
    Note("noteInfo.publishTime"),
    Note("noteDetail.publishTime"),
    TimeElement(".note-detail-time"),
    TimeElement(".publish-time"),
    TimeElement(".note-time"),
    TimeElement(".time-info"),
    TimeElement(r#"[data-testid="publish-time"]"#),
    TimeElement(".bottom-container .date"),
    TimeElement(".time"),
    TimeElement(".date"),
    TimeElement(".note-detail-desc .time"),
    TimeElement(".note-scroller .time"),
    TimeElement(".author-info .time"),
    TimeElement(".note-header .time"),
    TimeElement(".note-meta .time"),
    TimeElement(".post-time"),
    TimeElement(".creation-time"),
    TimeElement(".upload-time"),
    TimeElement("[data-time]"),
    TimeElement("[data-publish-time]"),
    TimeElement("[data-created-at]"),
    TimeElement(".timestamp"),
    TimeElement(".datetime"),
    TimeElement(".note-info .time"),
    TimeElement(".content-time"),
    TimeElement(".publish-date"),
    TimeElement(".create-date"),
    Meta(r#"meta[property="article:published_time"]"#),
    Meta(r#"meta[name="publish-time"]"#),
    Meta(r#"meta[property="article:created_time"]"#),
    Meta(r#"meta[name="created-time"]"#),
    Meta(r#"meta[property="og:published_time"]"#),
    Meta(r#"meta[name="date"]"#),
    Meta(r#"meta[property="article:modified_time"]"#),
    Meta(r#"meta[name="last-modified"]"#),
    JsonLd(&["datePublished", "dateCreated", "uploadDate"]),
];

const UPDATE_ATTRS: &[&str] = &[
    "data-update-time",
    "data-last-modified",
    "data-modified-time",
    "data-updated-at",
    "datetime",
    "title",
];

pub const UPDATE_TIME: &[Source] = &[
    Note("updateTime"),
    Note("lastModified"),
    Note("modifiedTime"),
    Note("lastUpdateTime"),
    Note("updatedAt"),
    Note("editTime"),
    Note("lastEditTime"),
    Note("noteInfo.updateTime"),
    Note("noteDetail.updateTime"),
    Note("noteInfo.lastModified"),
    Note("noteDetail.lastModified"),
    Note("note.updateTime"),
    Note("note.lastModified"),
    Note("data.updateTime"),
    Note("data.lastModified"),
    Note("meta.updateTime"),
    Note("meta.lastModified"),
    Note("timestamps.updated"),
    Note("timestamps.modified"),
    Note("time.updated"),
    Note("time.modified"),
    Global("__INITIAL_STATE__.note.updateTime"),
    Global("__NUXT__.data.0.updateTime"),
    Global("initialData.note.updateTime"),
    Global("pageData.note.updateTime"),
    Global("noteData.updateTime"),
    Global("appData.note.updateTime"),
    Selector { css: "[data-update-time]", attrs: UPDATE_ATTRS },
    Selector { css: ".update-time", attrs: UPDATE_ATTRS },
    Selector { css: ".last-modified", attrs: UPDATE_ATTRS },
    Selector { css: ".modified-time", attrs: UPDATE_ATTRS },
    Selector { css: ".edit-time", attrs: UPDATE_ATTRS },
    Selector { css: ".last-edit-time", attrs: UPDATE_ATTRS },
    Selector { css: "[data-last-modified]", attrs: UPDATE_ATTRS },
    Selector { css: "[data-modified-time]", attrs: UPDATE_ATTRS },
    Selector { css: "[data-updated-at]", attrs: UPDATE_ATTRS },
    Selector { css: ".note-update-time", attrs: UPDATE_ATTRS },
    Selector { css: ".last-update", attrs: UPDATE_ATTRS },
    Meta(r#"meta[property="article:modified_time"]"#),
    Meta(r#"meta[name="last-modified"]"#),
    Meta(r#"meta[property="og:updated_time"]"#),
    Meta(r#"meta[name="updated-time"]"#),
    Meta(r#"meta[name="edit-time"]"#),
    JsonLd(&["dateModified", "dateUpdated", "lastModified"]),
];

pub const VIDEO_COVER: &[Source] = &[
    Note("video.cover"),
    Note("video.image.firstFrameFileid"),
    Attr { css: "video[poster]", attrs: &["poster"] },
    Meta(r#"meta[property="og:video:image"]"#),
];

/// Resolver table for a scalar field; list-valued fields have none.
pub fn sources_for(field: NoteField) -> &'static [Source] {
    match field {
        NoteField::Title => TITLE,
        NoteField::Author => AUTHOR,
        NoteField::AuthorUrl => AUTHOR_URL,
        NoteField::AuthorBio => AUTHOR_BIO,
        NoteField::AuthorXhsId => AUTHOR_XHS_ID,
        NoteField::Likes => LIKES,
        NoteField::Comments => COMMENTS,
        NoteField::Shares => SHARES,
        NoteField::Collections => COLLECTIONS,
        NoteField::FollowerCount => FOLLOWER_COUNT,
        NoteField::LikesAndCollections => LIKES_AND_COLLECTIONS,
        NoteField::PublishTime => PUBLISH_TIME,
        NoteField::UpdateTime => UPDATE_TIME,
        NoteField::VideoCover => VIDEO_COVER,
        NoteField::Content | NoteField::Tags | NoteField::Topics | NoteField::Images => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::selector;

    const ALL: &[NoteField] = &[
        NoteField::Title,
        NoteField::Author,
        NoteField::AuthorUrl,
        NoteField::AuthorBio,
        NoteField::AuthorXhsId,
        NoteField::Likes,
        NoteField::Comments,
        NoteField::Shares,
        NoteField::Collections,
        NoteField::FollowerCount,
        NoteField::LikesAndCollections,
        NoteField::PublishTime,
        NoteField::UpdateTime,
        NoteField::VideoCover,
    ];

    #[test]
    fn test_every_selector_parses() {
        for field in ALL {
            for source in sources_for(*field) {
                let css = match source {
                    Source::HoverCard(c) | Source::TimeElement(c) | Source::Meta(c) => *c,
                    Source::Selector { css, .. }
                    | Source::Attr { css, .. }
                    | Source::HoverAttr { css, .. } => *css,
                    _ => continue,
                };
                assert!(selector(css).is_some(), "{} selector {:?} does not parse", field, css);
            }
        }
    }

    #[test]
    fn test_state_sources_come_first() {
        for field in ALL {
            let sources = sources_for(*field);
            let first_dom = sources
                .iter()
                .position(|s| !matches!(s, Source::Note(_) | Source::Global(_)))
                .unwrap_or(sources.len());
            assert!(
                sources[first_dom..]
                    .iter()
                    .all(|s| !matches!(s, Source::Note(_) | Source::Global(_))),
                "{} mixes state sources after DOM sources",
                field
            );
        }
    }

    #[test]
    fn test_hover_only_for_author_fields() {
        let non_author = [
            NoteField::Title,
            NoteField::Likes,
            NoteField::Comments,
            NoteField::Shares,
            NoteField::Collections,
            NoteField::PublishTime,
            NoteField::UpdateTime,
        ];
        for field in non_author {
            assert!(
                !sources_for(field)
                    .iter()
                    .any(|s| matches!(s, Source::HoverCard(_) | Source::HoverAttr { .. })),
                "{} should not probe the hover card",
                field
            );
        }
    }

    #[test]
    fn test_class_scan_is_last_resort() {
        for field in [NoteField::Likes, NoteField::Comments, NoteField::Shares, NoteField::Collections] {
            assert!(matches!(sources_for(field).last(), Some(Source::ClassScan(_))));
        }
    }
}

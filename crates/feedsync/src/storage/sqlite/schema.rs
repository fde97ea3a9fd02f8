//! SQLite schema definitions and SQL query constants.
//!
//! Friend links are stored once per pair with `user_a < user_b`; lookups
//! union both columns.

/// SQL statement to create all tables.
pub const CREATE_TABLES: &str = r#"
-- Posts table, create_time in nanoseconds since the Unix epoch
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    author_id TEXT NOT NULL,
    text TEXT NOT NULL,
    create_time INTEGER NOT NULL
);

-- Undirected friend links
CREATE TABLE IF NOT EXISTS friends (
    user_a TEXT NOT NULL,
    user_b TEXT NOT NULL,
    PRIMARY KEY (user_a, user_b),
    CHECK (user_a < user_b)
);

CREATE INDEX IF NOT EXISTS idx_posts_author_time ON posts(author_id, create_time);
CREATE INDEX IF NOT EXISTS idx_friends_user_b ON friends(user_b);
"#;

// Post queries
pub const INSERT_POST: &str = r#"
INSERT INTO posts (id, author_id, text, create_time)
VALUES (?1, ?2, ?3, ?4)
"#;

pub const SELECT_POST_BY_ID: &str = r#"
SELECT id, author_id, text, create_time
FROM posts
WHERE id = ?1
"#;

pub const SELECT_FEED_PAGE: &str = r#"
SELECT p.id, p.author_id, p.text, p.create_time
FROM posts p
WHERE p.author_id IN (
    SELECT user_b FROM friends WHERE user_a = ?1
    UNION
    SELECT user_a FROM friends WHERE user_b = ?1
)
AND p.author_id <> ?1
ORDER BY p.create_time DESC, p.id DESC
LIMIT ?2 OFFSET ?3
"#;

// Friend queries
pub const SELECT_FRIENDS: &str = r#"
SELECT user_b FROM friends WHERE user_a = ?1
UNION
SELECT user_a FROM friends WHERE user_b = ?1
ORDER BY 1
"#;

pub const INSERT_FRIEND_LINK: &str = r#"
INSERT INTO friends (user_a, user_b)
VALUES (?1, ?2)
"#;

pub const DELETE_FRIEND_LINK: &str = r#"
DELETE FROM friends
WHERE user_a = ?1 AND user_b = ?2
"#;

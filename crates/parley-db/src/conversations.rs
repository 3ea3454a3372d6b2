use chrono::{DateTime, Utc};
use parley_types::models::ConversationPeer;
use rusqlite::{Connection, params};
use tracing::warn;

use crate::Database;
use crate::clock::ts_column;
use crate::error::{OptionalExt, Result};
use crate::models::ConversationSummary;
use crate::store::{ConversationStore, DirectoryStore, MembershipStore};

/// Previews are hard-cut at this many characters, no ellipsis.
pub const PREVIEW_MAX_CHARS: usize = 40;

pub fn preview(body: &str) -> String {
    body.trim().chars().take(PREVIEW_MAX_CHARS).collect()
}

struct DirectActivity {
    peer: String,
    last_activity: DateTime<Utc>,
    body: String,
    photo_ref: Option<String>,
}

struct GroupActivity {
    last_activity: DateTime<Utc>,
    body: String,
}

impl ConversationStore for Database {
    // Not one consistent snapshot: each peer and group is read separately,
    // and names are resolved after the connection is released.
    fn list_conversations(&self, viewer: &str) -> Result<Vec<ConversationSummary>> {
        let groups = self.list_groups_for_user(viewer)?;

        let (direct, latest) = self.with_conn(|conn| {
            let direct = query_direct_activity(conn, viewer)?;
            let mut latest = Vec::with_capacity(groups.len());
            for group in &groups {
                latest.push(query_latest_group_message(conn, group.id)?);
            }
            Ok((direct, latest))
        })?;

        let mut summaries = Vec::with_capacity(direct.len() + groups.len());

        for activity in direct {
            summaries.push(ConversationSummary {
                name: self.display_name(&activity.peer),
                peer: ConversationPeer::Direct(activity.peer),
                is_group: false,
                photo_ref: activity.photo_ref,
                last_activity: activity.last_activity,
                preview: preview(&activity.body),
            });
        }

        for (group, latest) in groups.into_iter().zip(latest) {
            let (last_activity, preview_text) = match latest {
                Some(activity) => (activity.last_activity, preview(&activity.body)),
                None => (group.created_at, String::new()),
            };
            summaries.push(ConversationSummary {
                peer: ConversationPeer::Group(group.id),
                is_group: true,
                name: group.name,
                photo_ref: Some(group.photo_ref).filter(|r| !r.is_empty()),
                last_activity,
                preview: preview_text,
            });
        }

        // Ties keep no particular order.
        summaries.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(summaries)
    }
}

impl Database {
    fn display_name(&self, user_id: &str) -> String {
        let resolved = match self.nickname_resolver() {
            Some(resolver) => resolver.nickname(user_id),
            None => DirectoryStore::nickname(self, user_id),
        };
        resolved.unwrap_or_else(|e| {
            warn!("Nickname lookup for {} failed, using raw id: {}", user_id, e);
            user_id.to_string()
        })
    }
}

// -- Queries --

fn query_direct_activity(conn: &Connection, viewer: &str) -> Result<Vec<DirectActivity>> {
    let mut stmt = conn.prepare(
        "SELECT peer, MAX(created_at) FROM (
             SELECT CASE WHEN m.sender_id = ?1 THEN m.receiver_id ELSE m.sender_id END AS peer,
                    m.created_at
             FROM direct_messages m
             WHERE (m.sender_id = ?1 OR m.receiver_id = ?1)
               AND NOT EXISTS (SELECT 1 FROM direct_message_deletions d WHERE d.message_id = m.id)
         )
         GROUP BY peer",
    )?;

    let peers = stmt
        .query_map([viewer], |row| Ok((row.get::<_, String>(0)?, ts_column(row, 1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut out = Vec::with_capacity(peers.len());
    for (peer, last_activity) in peers {
        let body = query_latest_direct_body(conn, viewer, &peer)?.unwrap_or_default();
        let photo_ref = conn
            .query_row(
                "SELECT photo_ref FROM user_photos WHERE user_id = ?1",
                [&peer],
                |row| row.get(0),
            )
            .optional()?;
        out.push(DirectActivity {
            peer,
            last_activity,
            body,
            photo_ref,
        });
    }
    Ok(out)
}

fn query_latest_direct_body(conn: &Connection, a: &str, b: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT m.body FROM direct_messages m
         WHERE ((m.sender_id = ?1 AND m.receiver_id = ?2) OR (m.sender_id = ?2 AND m.receiver_id = ?1))
           AND NOT EXISTS (SELECT 1 FROM direct_message_deletions d WHERE d.message_id = m.id)
         ORDER BY m.created_at DESC, m.id DESC
         LIMIT 1",
        params![a, b],
        |row| row.get(0),
    )
    .optional()
}

fn query_latest_group_message(conn: &Connection, group_id: i64) -> Result<Option<GroupActivity>> {
    conn.query_row(
        "SELECT m.created_at, m.body FROM group_messages m
         WHERE m.group_id = ?1
           AND NOT EXISTS (SELECT 1 FROM group_message_deletions d WHERE d.message_id = m.id)
         ORDER BY m.created_at DESC, m.id DESC
         LIMIT 1",
        [group_id],
        |row| {
            Ok(GroupActivity {
                last_activity: ts_column(row, 0)?,
                body: row.get(1)?,
            })
        },
    )
    .optional()
}

/// Topic carrying the messages of a channel
pub fn channel_topic(channel_id: &str) -> String {
    format!("channels/{channel_id}/messages")
}

use log::info;
use reqwest::blocking::{multipart, Client, Response};
use serde::{Deserialize, Serialize};

use crate::config::TwitterConfig;

use super::{PostId, PublishError, Publisher};

#[derive(Debug, Serialize)]
struct Reply<'a> {
    in_reply_to_tweet_id: &'a str,
}

#[derive(Debug, Serialize)]
struct Media {
    media_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TweetRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<Reply<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<Media>,
}

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    data: Created,
}

/// Publishes through the X API v2 with a user access token.
pub struct TwitterClient {
    client: Client,
    config: TwitterConfig,
}

impl TwitterClient {
    pub fn new(config: TwitterConfig) -> TwitterClient {
        TwitterClient {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn check(response: Response) -> Result<Response, PublishError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(PublishError::Api {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            })
        }
    }

    fn tweet(&self, request: &TweetRequest) -> Result<PostId, PublishError> {
        let response = self
            .client
            .post(self.endpoint("2/tweets"))
            .bearer_auth(&self.config.access_token)
            .json(request)
            .send()?;
        let created: CreatedResponse = TwitterClient::check(response)?.json()?;
        info!("published post {}", created.data.id);
        Ok(PostId(created.data.id))
    }

    /// Fetch the image and upload it, returning the media id.
    fn upload_image(&self, image_url: &str) -> Result<String, PublishError> {
        let image = self
            .client
            .get(image_url)
            .send()
            .map_err(|e| PublishError::Media(format!("{image_url}: {e}")))?;
        if !image.status().is_success() {
            return Err(PublishError::Media(format!(
                "{image_url}: {}",
                image.status()
            )));
        }
        let bytes = image.bytes()?.to_vec();
        let part = multipart::Part::bytes(bytes)
            .file_name("graph.png")
            .mime_str("image/png")?;
        let form = multipart::Form::new()
            .text("media_category", "tweet_image")
            .part("media", part);
        let response = self
            .client
            .post(self.endpoint("2/media/upload"))
            .bearer_auth(&self.config.access_token)
            .multipart(form)
            .send()?;
        let uploaded: CreatedResponse = TwitterClient::check(response)?.json()?;
        Ok(uploaded.data.id)
    }
}

impl Publisher for TwitterClient {
    fn publish(&self, text: &str, reply_to: Option<&PostId>) -> Result<PostId, PublishError> {
        self.tweet(&TweetRequest {
            text,
            reply: reply_to.map(|id| Reply {
                in_reply_to_tweet_id: &id.0,
            }),
            media: None,
        })
    }

    fn publish_with_media(
        &self,
        text: &str,
        image_url: &str,
        reply_to: Option<&PostId>,
    ) -> Result<PostId, PublishError> {
        let media_id = self.upload_image(image_url)?;
        self.tweet(&TweetRequest {
            text,
            reply: reply_to.map(|id| Reply {
                in_reply_to_tweet_id: &id.0,
            }),
            media: Some(Media {
                media_ids: vec![media_id],
            }),
        })
    }

    fn send_direct_message(&self, text: &str) -> Result<(), PublishError> {
        let path = format!(
            "2/dm_conversations/with/{}/messages",
            self.config.alert_recipient_id
        );
        let response = self
            .client
            .post(self.endpoint(&path))
            .bearer_auth(&self.config.access_token)
            .json(&MessageRequest { text })
            .send()?;
        TwitterClient::check(response)?;
        info!("sent direct message to {}", self.config.alert_recipient_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use serde_json::json;

    use super::*;
    use crate::config::Config;

    #[test]
    fn tweet_payload() -> Result<(), Box<dyn Error>> {
        let plain = TweetRequest {
            text: "Hola",
            reply: None,
            media: None,
        };
        assert_eq!(serde_json::to_value(&plain)?, json!({"text": "Hola"}));

        let id = PostId("123".to_string());
        let reply = TweetRequest {
            text: "Hola",
            reply: Some(Reply {
                in_reply_to_tweet_id: &id.0,
            }),
            media: Some(Media {
                media_ids: vec!["9".to_string()],
            }),
        };
        assert_eq!(
            serde_json::to_value(&reply)?,
            json!({"text": "Hola", "reply": {"in_reply_to_tweet_id": "123"}, "media": {"media_ids": ["9"]}})
        );
        Ok(())
    }

    #[test]
    fn created_response() -> Result<(), Box<dyn Error>> {
        let res: CreatedResponse =
            serde_json::from_str(r#"{"data": {"id": "1445880548472328192", "text": "Hola"}}"#)?;
        assert_eq!(res.data.id, "1445880548472328192");
        Ok(())
    }

    #[test]
    fn endpoints() {
        let mut config = Config::from_env().twitter;
        config.api_url = "https://api.example.org/".to_string();
        let client = TwitterClient::new(config);
        assert_eq!(client.endpoint("2/tweets"), "https://api.example.org/2/tweets");
    }

    #[ignore]
    #[test]
    fn send_dm() -> Result<(), Box<dyn Error>> {
        let config = Config::load("test")?;
        TwitterClient::new(config.twitter).send_direct_message("Test message")?;
        Ok(())
    }
}

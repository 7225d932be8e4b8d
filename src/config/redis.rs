use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub password: SecretString,
    #[serde(default)]
    pub url: Option<SecretString>,
}

impl RedisSettings {
    pub fn get_redis_url(&self) -> SecretString {
        match &self.url {
            Some(url) => url.clone(),
            None => {
                let auth = if self.password.expose_secret().is_empty() {
                    String::new()
                } else {
                    format!(":{}@", self.password.expose_secret())
                };
                SecretString::new(
                    format!("redis://{}{}:{}", auth, self.host, self.port).into_boxed_str(),
                )
            }
        }
    }
}

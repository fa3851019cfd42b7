//! Headless browser collaborator for the crawler.
//!
//! [`Browser`] and [`Page`] are the seams the crawl pipeline is written
//! against. [`WebDriverBrowser`] drives a real Chrome through a chromedriver
//! endpoint; tests substitute scripted fakes.

pub mod best_effort;
pub mod error;
pub mod locator;
pub mod page;
pub mod webdriver;

pub use best_effort::best_effort;
pub use error::BrowserError;
pub use locator::{Locator, TextMatch};
pub use page::{Browser, CapturedResponse, Page, ScreenshotScope, Viewport};
pub use webdriver::{WebDriverBrowser, WebDriverPage};

use actix_web::{http::header::LOCATION, web, HttpRequest, HttpResponse, Responder};
use log::{debug, info};

use crate::{
    models::{CreateShortUrlDto, ShortUrlResponseDto},
    repositories::ShortenedUrlRepository,
    services::{ShortenedUrlService, ShortenedUrlServiceTrait},
    types::Result,
};

pub type ShortenedUrlServiceType = ShortenedUrlService<ShortenedUrlRepository>;

/// Create shortened URL handler
pub async fn shorten_handler(
    req: HttpRequest,
    dto: web::Json<CreateShortUrlDto>,
    service: web::Data<ShortenedUrlServiceType>,
) -> Result<impl Responder> {
    let url = service.shorten(dto.into_inner()).await?;

    // The short link points back at whichever host the client used
    let base_url = {
        let conn = req.connection_info();
        format!("{}://{}", conn.scheme(), conn.host())
    };

    Ok(HttpResponse::Ok().json(ShortUrlResponseDto::new(&base_url, &url.short_id)))
}

/// Redirect handler
pub async fn redirect_handler(
    path: web::Path<String>,
    service: web::Data<ShortenedUrlServiceType>,
) -> Result<impl Responder> {
    let short_id = path.into_inner();
    debug!("Redirect requested for short id: {}", short_id);

    let original_url = service.resolve(&short_id).await?;

    info!("Redirecting '{}' to '{}'", short_id, original_url);
    Ok(HttpResponse::MovedPermanently()
        .insert_header((LOCATION, original_url))
        .finish())
}

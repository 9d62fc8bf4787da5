use anyhow::Result;
use axum::http::{Method, StatusCode};
use diypresso_server::test_utils::http::{Part, TestApp};
use std::fs;
use std::time::{Duration, Instant};
use tempfile::TempDir;

struct Dirs {
    uploads: TempDir,
    firmware: TempDir,
}

impl Dirs {
    fn new() -> Result<Self> {
        Ok(Self {
            uploads: tempfile::tempdir()?,
            firmware: tempfile::tempdir()?,
        })
    }

    fn app(&self) -> TestApp {
        TestApp::new(self.uploads.path(), self.firmware.path())
    }
}

mod upload_tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_is_saved_under_field_name() -> Result<()> {
        // Given: an upload receiver writing into an empty directory
        let dirs = Dirs::new()?;
        let app = dirs.app();

        // When: the camera posts a picture and a JSON status document
        let response = app
            .post_multipart(
                "/api/camera/1",
                &[
                    Part::File {
                        name: "Image",
                        file_name: "capture.jpg",
                        data: b"\xff\xd8\xff\xe0JPEG",
                    },
                    Part::File {
                        name: "config",
                        file_name: "status.json",
                        data: br#"{"shots":12}"#,
                    },
                ],
            )
            .await?;

        // Then: the request succeeds with an empty JSON object
        response
            .assert_status(StatusCode::OK)
            .assert_content_type("application/json");
        assert_eq!(response.body(), "{}");

        // And: files are named after the fields, not the declared file names
        assert_eq!(fs::read(dirs.uploads.path().join("Image"))?, b"\xff\xd8\xff\xe0JPEG");
        assert_eq!(
            fs::read_to_string(dirs.uploads.path().join("config"))?,
            r#"{"shots":12}"#
        );
        assert!(!dirs.uploads.path().join("capture.jpg").exists());
        assert!(!dirs.uploads.path().join("status.json").exists());

        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_json_still_succeeds() -> Result<()> {
        let dirs = Dirs::new()?;
        let app = dirs.app();

        let response = app
            .post_multipart(
                "/api/camera",
                &[Part::File {
                    name: "config",
                    file_name: "config.json",
                    data: b"{not json",
                }],
            )
            .await?;

        response.assert_status(StatusCode::OK);
        assert_eq!(response.body(), "{}");
        assert_eq!(
            fs::read_to_string(dirs.uploads.path().join("config"))?,
            "{not json"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_upload_overwrites_previous_file() -> Result<()> {
        let dirs = Dirs::new()?;
        let app = dirs.app();
        fs::write(dirs.uploads.path().join("config"), "old contents that are longer")?;

        app.post_multipart(
            "/api/camera",
            &[Part::File {
                name: "config",
                file_name: "config.json",
                data: b"{}",
            }],
        )
        .await?
        .assert_status(StatusCode::OK);

        assert_eq!(fs::read_to_string(dirs.uploads.path().join("config"))?, "{}");
        Ok(())
    }

    #[tokio::test]
    async fn test_report_is_deleted_on_every_post() -> Result<()> {
        let dirs = Dirs::new()?;
        let app = dirs.app();
        let report = dirs.uploads.path().join("Report");
        fs::write(&report, "previous report")?;

        // The upload does not mention the report at all
        app.post_multipart(
            "/api/camera",
            &[Part::Text {
                name: "camera",
                value: "front",
            }],
        )
        .await?
        .assert_status(StatusCode::OK);
        assert!(!report.exists());

        // A missing report does not fail the next request
        app.post_multipart(
            "/api/camera",
            &[Part::Text {
                name: "camera",
                value: "back",
            }],
        )
        .await?
        .assert_status(StatusCode::OK);

        // A report uploaded in the same request survives, since removal happens first
        app.post_multipart(
            "/api/camera",
            &[Part::File {
                name: "Report",
                file_name: "report.txt",
                data: b"fresh",
            }],
        )
        .await?
        .assert_status(StatusCode::OK);
        assert_eq!(fs::read_to_string(&report)?, "fresh");

        Ok(())
    }

    #[tokio::test]
    async fn test_report_that_cannot_be_removed_does_not_fail_the_post() -> Result<()> {
        // Given: a directory sits where the report file would be
        let dirs = Dirs::new()?;
        let app = dirs.app();
        let report = dirs.uploads.path().join("Report");
        fs::create_dir(&report)?;

        // When: a picture is posted
        let response = app
            .post_multipart(
                "/api/camera",
                &[Part::File {
                    name: "Image",
                    file_name: "capture.jpg",
                    data: b"JPEG",
                }],
            )
            .await?;

        // Then: the removal failure is only logged
        response.assert_status(StatusCode::OK);
        assert_eq!(response.body(), "{}");
        assert!(report.is_dir());
        assert_eq!(fs::read(dirs.uploads.path().join("Image"))?, b"JPEG");
        Ok(())
    }

    #[tokio::test]
    async fn test_large_upload_is_accepted_without_configured_limit() -> Result<()> {
        let dirs = Dirs::new()?;
        let app = dirs.app();
        // Above axum's 2 MB default body limit
        let picture = vec![0xAB_u8; 3 * 1024 * 1024];

        let response = app
            .post_multipart(
                "/api/camera",
                &[Part::File {
                    name: "Image",
                    file_name: "capture.jpg",
                    data: &picture,
                }],
            )
            .await?;

        response.assert_status(StatusCode::OK);
        assert_eq!(response.body(), "{}");
        assert_eq!(fs::read(dirs.uploads.path().join("Image"))?.len(), picture.len());
        Ok(())
    }

    #[tokio::test]
    async fn test_response_is_delayed() -> Result<()> {
        let dirs = Dirs::new()?;
        let delay = Duration::from_millis(200);
        let app = TestApp::with_response_delay(dirs.uploads.path(), dirs.firmware.path(), delay);

        let started = Instant::now();
        let response = app
            .post_multipart(
                "/api/camera",
                &[Part::Text {
                    name: "camera",
                    value: "front",
                }],
            )
            .await?;

        response.assert_status(StatusCode::OK);
        assert!(
            started.elapsed() >= delay,
            "answered after {:?}",
            started.elapsed()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_form_fields_are_not_written() -> Result<()> {
        let dirs = Dirs::new()?;
        let app = dirs.app();

        app.post_multipart(
            "/api/camera",
            &[Part::Text {
                name: "camera",
                value: "front",
            }],
        )
        .await?
        .assert_status(StatusCode::OK);

        assert!(!dirs.uploads.path().join("camera").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_post_without_multipart_payload() -> Result<()> {
        let dirs = Dirs::new()?;
        let app = dirs.app();

        let response = app
            .post_binary("/api/camera", "application/json", br#"{"a":1}"#)
            .await?;
        response.assert_status(StatusCode::OK);
        assert_eq!(response.body(), "{}");
        Ok(())
    }

    #[tokio::test]
    async fn test_field_name_cannot_escape_upload_dir() -> Result<()> {
        let dirs = Dirs::new()?;
        let app = dirs.app();

        app.post_multipart(
            "/api/camera",
            &[Part::File {
                name: "../escaped",
                file_name: "escaped.txt",
                data: b"nope",
            }],
        )
        .await?
        .assert_status(StatusCode::OK);

        let parent = dirs.uploads.path().parent().unwrap();
        assert!(!parent.join("escaped").exists());
        assert_eq!(fs::read_dir(dirs.uploads.path())?.count(), 0);
        Ok(())
    }
}

mod method_tests {
    use super::*;

    #[tokio::test]
    async fn test_other_methods_are_rejected() -> Result<()> {
        let dirs = Dirs::new()?;
        let app = dirs.app();

        for method in [Method::GET, Method::DELETE, Method::PUT, Method::PATCH] {
            let response = app.request(method.clone(), "/api/camera/1").await?;
            response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
            assert!(response.body().is_empty(), "{} returned a body", method);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_path() -> Result<()> {
        let dirs = Dirs::new()?;
        let app = dirs.app();

        app.get("/somewhere/else")
            .await?
            .assert_status(StatusCode::NOT_FOUND);
        Ok(())
    }
}

mod firmware_tests {
    use super::*;

    #[tokio::test]
    async fn test_firmware_is_served() -> Result<()> {
        let dirs = Dirs::new()?;
        fs::create_dir(dirs.firmware.path().join("v2"))?;
        fs::write(dirs.firmware.path().join("v2").join("firmware.bin"), b"BIN")?;
        let app = dirs.app();

        let response = app.get("/fw/v2/firmware.bin").await?;
        response.assert_status(StatusCode::OK);
        assert_eq!(response.body_bytes(), b"BIN");

        app.get("/fw/v3/firmware.bin")
            .await?
            .assert_status(StatusCode::NOT_FOUND);
        Ok(())
    }
}

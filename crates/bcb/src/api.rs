//! Catalog of the Olinda OData services.

use std::fmt;
use std::sync::Arc;

use bcb_core::{Result, Transport};
use bcb_odata::{Endpoint, FrameOptions, HttpTransport, Service};
use tracing::debug;

/// Root of the Olinda services.
pub const OLINDA_BASE_URL: &str = "https://olinda.bcb.gov.br/olinda/servico";

/// A connected OData service.
///
/// Endpoints handed out by [`ODataApi::endpoint`] share the service's
/// transport and the [`FrameOptions`] given at connection time.
#[derive(Clone, Debug)]
pub struct ODataApi {
    service: Service,
    options: FrameOptions,
}

impl ODataApi {
    /// Connects to any OData v4 service with the default transport.
    ///
    /// Service URLs on Olinda follow the pattern
    /// `https://olinda.bcb.gov.br/olinda/servico/<service>/versao/v1/odata/`.
    pub async fn connect(url: &str) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new()?);
        Self::connect_with(url, transport, FrameOptions::default()).await
    }

    /// Connects with a custom transport and frame options.
    pub async fn connect_with(
        url: &str,
        transport: Arc<dyn Transport>,
        options: FrameOptions,
    ) -> Result<Self> {
        let service = Service::connect(url, transport).await?;
        debug!(
            url,
            entity_sets = service.metadata().entity_sets().count(),
            function_imports = service.metadata().function_imports().count(),
            "Connected to OData service"
        );
        Ok(Self { service, options })
    }

    /// Describes the whole service, or one endpoint when `endpoint` is given.
    pub fn describe(&self, endpoint: Option<&str>) -> Result<String> {
        match endpoint {
            Some(name) => Ok(self.service.lookup(name)?.describe()),
            None => Ok(self.service.describe()),
        }
    }

    /// Returns the endpoint named `name`.
    pub fn endpoint(&self, name: &str) -> Result<Endpoint> {
        let target = self.service.lookup(name)?;
        Ok(Endpoint::new(
            target,
            self.service.url(),
            Arc::clone(self.service.transport()),
            self.options.clone(),
        ))
    }

    /// Underlying service.
    #[must_use]
    pub const fn service(&self) -> &Service {
        &self.service
    }

    /// Frame options applied by the endpoints.
    #[must_use]
    pub const fn frame_options(&self) -> &FrameOptions {
        &self.options
    }
}

/// Known OData services of the Banco Central do Brasil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Api {
    /// Market expectations survey (Focus).
    Expectativas,
    /// PTAX exchange rates.
    PTAX,
    /// Financial institutions' reported data.
    IFDATA,
    /// Interest rates charged by financial institutions.
    TaxaJuros,
    /// Real estate market statistics.
    MercadoImobiliario,
    /// Instant payment system (Pix) statistics.
    SPI,
    /// Bank fees by institution.
    TarifasBancariasPorInstituicaoFinanceira,
    /// Bank fees by service.
    TarifasBancariasPorServico,
    /// Electronic service points by institution.
    PostosAtendimentoEletronicoPorInstituicaoFinanceira,
    /// Banking correspondents by institution.
    PostosAtendimentoCorrespondentesPorInstituicaoFinanceira,
    /// Reserve transfer system (STR) statistics.
    EstatisticasSTR,
    /// Currency in circulation.
    DinheiroCirculacao,
}

impl Api {
    /// Every catalogued service.
    pub const ALL: [Self; 12] = [
        Self::Expectativas,
        Self::PTAX,
        Self::IFDATA,
        Self::TaxaJuros,
        Self::MercadoImobiliario,
        Self::SPI,
        Self::TarifasBancariasPorInstituicaoFinanceira,
        Self::TarifasBancariasPorServico,
        Self::PostosAtendimentoEletronicoPorInstituicaoFinanceira,
        Self::PostosAtendimentoCorrespondentesPorInstituicaoFinanceira,
        Self::EstatisticasSTR,
        Self::DinheiroCirculacao,
    ];

    /// Service path segment under [`OLINDA_BASE_URL`].
    #[must_use]
    pub const fn service_name(&self) -> &'static str {
        match self {
            Self::Expectativas => "Expectativas",
            Self::PTAX => "PTAX",
            Self::IFDATA => "IFDATA",
            Self::TaxaJuros => "taxaJuros",
            Self::MercadoImobiliario => "MercadoImobiliario",
            Self::SPI => "SPI",
            Self::TarifasBancariasPorInstituicaoFinanceira => {
                "Informes_ListaTarifasPorInstituicaoFinanceira"
            }
            Self::TarifasBancariasPorServico => "Informes_ListaValoresDeServicoBancario",
            Self::PostosAtendimentoEletronicoPorInstituicaoFinanceira => {
                "Informes_PostosDeAtendimentoEletronico"
            }
            Self::PostosAtendimentoCorrespondentesPorInstituicaoFinanceira => {
                "Informes_Correspondentes"
            }
            Self::EstatisticasSTR => "STR",
            Self::DinheiroCirculacao => "mecir_dinheiro_em_circulacao",
        }
    }

    const fn version(&self) -> u8 {
        match self {
            Self::TaxaJuros => 2,
            _ => 1,
        }
    }

    /// Service root URL, with a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!(
            "{OLINDA_BASE_URL}/{}/versao/v{}/odata/",
            self.service_name(),
            self.version()
        )
    }

    /// Short description of the published data.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Expectativas => {
                "Market expectations for macroeconomic variables collected from about 130 \
                 financial institutions, published on the first business day of each week"
            }
            Self::PTAX => "Daily PTAX buy and sell rates for the US dollar and other currencies",
            Self::IFDATA => "Quarterly accounting and prudential data of financial institutions",
            Self::TaxaJuros => "Average interest rates charged by financial institutions per product",
            Self::MercadoImobiliario => "Real estate credit and market statistics",
            Self::SPI => "Instant payment system (Pix) settlement statistics",
            Self::TarifasBancariasPorInstituicaoFinanceira => {
                "Fees charged by each financial institution"
            }
            Self::TarifasBancariasPorServico => "Fee values grouped by banking service",
            Self::PostosAtendimentoEletronicoPorInstituicaoFinanceira => {
                "Electronic service points of each financial institution"
            }
            Self::PostosAtendimentoCorrespondentesPorInstituicaoFinanceira => {
                "Banking correspondents of each financial institution"
            }
            Self::EstatisticasSTR => "Reserve transfer system (STR) volume statistics",
            Self::DinheiroCirculacao => "Banknotes and coins in circulation",
        }
    }

    /// Connects with the default transport and frame options.
    pub async fn connect(&self) -> Result<ODataApi> {
        ODataApi::connect(&self.base_url()).await
    }

    /// Connects with a custom transport and frame options.
    pub async fn connect_with(
        &self,
        transport: Arc<dyn Transport>,
        options: FrameOptions,
    ) -> Result<ODataApi> {
        ODataApi::connect_with(&self.base_url(), transport, options).await
    }
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service_name())
    }
}
